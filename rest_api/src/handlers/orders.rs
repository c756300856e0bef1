// rest_api/src/handlers/orders.rs

use axum::extract::State;
use chrono::Utc;

use lib::services::orders::{self, OrderCheckout, OrderRequest, OrderStatusRequest};
use models::{EntityId, Order};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::response::{Created, Envelope};
use crate::state::AppState;

pub async fn place(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<OrderRequest>,
) -> ApiResult<Created<OrderCheckout>> {
    let actor = user.require(&state, "orders:place")?;
    let placed =
        orders::place_order(state.storage(), &state.checkout, actor, request, Utc::now()).await?;
    Ok(Created(placed))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Envelope<Vec<Order>>> {
    Ok(Envelope(orders::my_orders(state.storage(), &actor).await?))
}

pub async fn advance(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(request): ApiJson<OrderStatusRequest>,
) -> ApiResult<Envelope<Order>> {
    let order = orders::advance_order(state.storage(), &actor, &id, request.status, Utc::now()).await?;
    Ok(Envelope(order))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Order>> {
    Ok(Envelope(orders::cancel_order(state.storage(), &actor, &id, Utc::now()).await?))
}
