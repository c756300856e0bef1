// rest_api/src/handlers/appointments.rs

use axum::{body::Bytes, extract::State};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use lib::services::{booking, cancellation, lifecycle, slots};
use lib::services::booking::{Booking, BookingRequest};
use lib::services::cancellation::CancelRequest;
use lib::services::lifecycle::StartedAppointment;
use lib::services::slots::SlotAvailability;
use models::{Appointment, EntityId};

use crate::error::ApiResult;
use crate::extract::{optional_json, ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::response::{Created, Envelope};
use crate::state::AppState;

pub async fn book(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<BookingRequest>,
) -> ApiResult<Created<Booking>> {
    let actor = user.require(&state, "appointments:book")?;
    let booking =
        booking::book_appointment(state.storage(), &state.checkout, actor, request, Utc::now()).await?;
    Ok(Created(booking))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Envelope<Vec<Appointment>>> {
    Ok(Envelope(booking::my_appointments(state.storage(), &actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub from: Option<NaiveDate>,
    pub days: Option<u32>,
}

/// Public: patients browse slots before signing in.
pub async fn slots(
    State(state): State<AppState>,
    ApiPath(doctor_id): ApiPath<EntityId>,
    ApiQuery(query): ApiQuery<SlotsQuery>,
) -> ApiResult<Envelope<SlotAvailability>> {
    let availability =
        slots::doctor_slots(state.storage(), &doctor_id, query.from, query.days, Utc::now()).await?;
    Ok(Envelope(availability))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Appointment>> {
    Ok(Envelope(booking::get_appointment(state.storage(), &actor, &id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
    body: Bytes,
) -> ApiResult<Envelope<Appointment>> {
    let actor = user.require(&state, "appointments:cancel")?;
    let request: CancelRequest = optional_json(&body)?;
    let appointment = cancellation::cancel_appointment(
        state.storage(),
        actor,
        &id,
        request,
        state.cancellation_notice(),
        Utc::now(),
    )
    .await?;
    Ok(Envelope(appointment))
}

pub async fn start(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<StartedAppointment>> {
    let actor = user.require(&state, "appointments:manage")?;
    Ok(Envelope(lifecycle::start_appointment(state.storage(), actor, &id, Utc::now()).await?))
}

pub async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Appointment>> {
    let actor = user.require(&state, "appointments:manage")?;
    Ok(Envelope(lifecycle::complete_appointment(state.storage(), actor, &id, Utc::now()).await?))
}

pub async fn no_show(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<EntityId>,
) -> ApiResult<Envelope<Appointment>> {
    let actor = user.require(&state, "appointments:manage")?;
    Ok(Envelope(lifecycle::mark_no_show(state.storage(), actor, &id, Utc::now()).await?))
}
