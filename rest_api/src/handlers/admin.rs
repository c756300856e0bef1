// rest_api/src/handlers/admin.rs

//! Analytics dashboard and the doctor verification queue.

use axum::{body::Bytes, extract::State};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use lib::services::verification::{self, RejectRequest};
use lib::services::analytics;
use models::{
    AuditLogEntry, Doctor, DoctorRanking, EntityId, GrowthPoint, PlatformMetrics, TimeseriesPoint,
};

use crate::error::ApiResult;
use crate::extract::{optional_json, ApiPath, ApiQuery, AuthUser};
use crate::handlers::notifications::LimitQuery;
use crate::response::Envelope;
use crate::state::AppState;

const ANALYTICS: &str = "analytics:read";
const VERIFICATIONS: &str = "verifications:decide";

#[derive(Debug, Deserialize)]
pub struct GrowthQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn metrics(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Envelope<PlatformMetrics>> {
    let actor = user.require(&state, ANALYTICS)?;
    Ok(Envelope(analytics::metrics(state.storage(), actor).await?))
}

pub async fn growth(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<GrowthQuery>,
) -> ApiResult<Envelope<Vec<GrowthPoint>>> {
    let actor = user.require(&state, ANALYTICS)?;
    Ok(Envelope(analytics::growth(state.storage(), actor, query.months, Utc::now()).await?))
}

pub async fn activity(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Envelope<Vec<AuditLogEntry>>> {
    let actor = user.require(&state, ANALYTICS)?;
    Ok(Envelope(analytics::activity(state.storage(), actor, query.limit).await?))
}

pub async fn timeseries(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<Envelope<Vec<TimeseriesPoint>>> {
    let actor = user.require(&state, ANALYTICS)?;
    let points =
        analytics::timeseries(state.storage(), actor, query.from, query.to, Utc::now()).await?;
    Ok(Envelope(points))
}

pub async fn top_doctors(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Envelope<Vec<DoctorRanking>>> {
    let actor = user.require(&state, ANALYTICS)?;
    Ok(Envelope(analytics::top_doctors(state.storage(), actor, query.limit).await?))
}

pub async fn pending_verifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Envelope<Vec<Doctor>>> {
    let actor = user.require(&state, VERIFICATIONS)?;
    Ok(Envelope(verification::list_pending(state.storage(), actor).await?))
}

pub async fn verification_detail(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(doctor_id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Doctor>> {
    let actor = user.require(&state, VERIFICATIONS)?;
    Ok(Envelope(verification::get_verification(state.storage(), actor, &doctor_id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(doctor_id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Doctor>> {
    let actor = user.require(&state, VERIFICATIONS)?;
    Ok(Envelope(verification::approve(state.storage(), actor, &doctor_id, Utc::now()).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(doctor_id): ApiPath<EntityId>,
    body: Bytes,
) -> ApiResult<Envelope<Doctor>> {
    let actor = user.require(&state, VERIFICATIONS)?;
    let request: RejectRequest = optional_json(&body)?;
    let doctor = verification::reject(state.storage(), actor, &doctor_id, request, Utc::now()).await?;
    Ok(Envelope(doctor))
}
