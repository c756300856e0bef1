// rest_api/src/handlers/profiles.rs

use axum::extract::State;
use chrono::Utc;

use lib::services::profiles::{self, PatientProfileRequest};
use lib::services::verification::{self, DoctorProfileRequest};
use models::{AvailabilityWindow, Doctor, EntityId, NewAvailabilityWindow, Patient};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::response::{Created, Envelope};
use crate::state::AppState;

pub async fn create_patient(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<PatientProfileRequest>,
) -> ApiResult<Created<Patient>> {
    let actor = user.require(&state, "profile:patient")?;
    Ok(Created(profiles::create_patient_profile(state.storage(), actor, request, Utc::now()).await?))
}

/// New doctors start out pending verification.
pub async fn submit_doctor(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<DoctorProfileRequest>,
) -> ApiResult<Created<Doctor>> {
    let actor = user.require(&state, "profile:doctor")?;
    let doctor = verification::submit_doctor_profile(
        state.storage(),
        actor,
        request,
        state.checkout.currency(),
        Utc::now(),
    )
    .await?;
    Ok(Created(doctor))
}

pub async fn doctor(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Doctor>> {
    Ok(Envelope(profiles::get_doctor_public(state.storage(), &id).await?))
}

pub async fn availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Vec<AvailabilityWindow>>> {
    Ok(Envelope(profiles::get_availability(state.storage(), &id).await?))
}

pub async fn set_my_availability(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(windows): ApiJson<Vec<NewAvailabilityWindow>>,
) -> ApiResult<Envelope<Vec<AvailabilityWindow>>> {
    let actor = user.require(&state, "availability:manage")?;
    Ok(Envelope(profiles::set_my_availability(state.storage(), actor, windows, Utc::now()).await?))
}
