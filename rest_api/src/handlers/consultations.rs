// rest_api/src/handlers/consultations.rs

use axum::extract::State;
use chrono::Utc;

use lib::services::consultation::{self, PrescriptionRequest};
use models::{Consultation, ConsultationNotes, EntityId, Prescription};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::response::{Created, Envelope};
use crate::state::AppState;

pub async fn get(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(appointment_id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Consultation>> {
    Ok(Envelope(consultation::get_consultation(state.storage(), &actor, &appointment_id).await?))
}

pub async fn update_notes(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<EntityId>,
    ApiJson(notes): ApiJson<ConsultationNotes>,
) -> ApiResult<Envelope<Consultation>> {
    let actor = user.require(&state, "consultations:write")?;
    let updated =
        consultation::update_notes(state.storage(), actor, &appointment_id, notes, Utc::now()).await?;
    Ok(Envelope(updated))
}

pub async fn prescribe(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<EntityId>,
    ApiJson(request): ApiJson<PrescriptionRequest>,
) -> ApiResult<Created<Prescription>> {
    let actor = user.require(&state, "prescriptions:issue")?;
    let prescription =
        consultation::issue_prescription(state.storage(), actor, &appointment_id, request, Utc::now())
            .await?;
    Ok(Created(prescription))
}

pub async fn my_prescriptions(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Envelope<Vec<Prescription>>> {
    let actor = user.require(&state, "prescriptions:read")?;
    Ok(Envelope(consultation::my_prescriptions(state.storage(), actor).await?))
}
