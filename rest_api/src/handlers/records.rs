// rest_api/src/handlers/records.rs

use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};

use lib::services::records::{self, RecordRequest, ShareRequest};
use models::{EntityId, MedicalRecord};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::response::{Created, Envelope};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<RecordRequest>,
) -> ApiResult<Created<MedicalRecord>> {
    let actor = user.require(&state, "records:manage")?;
    Ok(Created(records::create_record(state.storage(), actor, request, Utc::now()).await?))
}

pub async fn mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Envelope<Vec<MedicalRecord>>> {
    let actor = user.require(&state, "records:manage")?;
    Ok(Envelope(records::my_records(state.storage(), actor).await?))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<MedicalRecord>> {
    Ok(Envelope(records::get_record(state.storage(), &actor, &id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Value>> {
    let actor = user.require(&state, "records:manage")?;
    records::delete_record(state.storage(), actor, &id, Utc::now()).await?;
    Ok(Envelope(json!({ "id": id, "deleted": true })))
}

pub async fn share(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(request): ApiJson<ShareRequest>,
) -> ApiResult<Envelope<MedicalRecord>> {
    let actor = user.require(&state, "records:manage")?;
    Ok(Envelope(records::share_record(state.storage(), actor, &id, request, Utc::now()).await?))
}

pub async fn revoke(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
    ApiJson(request): ApiJson<ShareRequest>,
) -> ApiResult<Envelope<MedicalRecord>> {
    let actor = user.require(&state, "records:manage")?;
    Ok(Envelope(records::revoke_record(state.storage(), actor, &id, request, Utc::now()).await?))
}
