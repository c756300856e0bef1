// rest_api/src/handlers/notifications.rs

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;

use lib::services::activity;
use models::{EntityId, Notification};

use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, AuthUser};
use crate::response::Envelope;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Envelope<Vec<Notification>>> {
    Ok(Envelope(activity::my_notifications(state.storage(), &actor, query.limit).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Notification>> {
    Ok(Envelope(activity::mark_read(state.storage(), &actor, &id, Utc::now()).await?))
}
