// lib/src/services/booking.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use models::errors::{PrectaError, PrectaResult};
use models::{
    Appointment, ConsultationType, EntityId, NewAppointment, NotificationKind, Payment,
    PaymentPurpose, UserRole,
};

use super::access::{self, Actor};
use super::activity;
use super::payments::Checkout;
use crate::storage_engine::PrectaStorage;

pub const MIN_DURATION_MINUTES: i32 = 5;
pub const MAX_DURATION_MINUTES: i32 = 240;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: EntityId,
    pub scheduled_at: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub appointment: Appointment,
    pub payment: Payment,
    pub checkout_url: String,
}

/// Books `request` for the calling patient.
///
/// The appointment is stored first and in `pending_payment`; the storage
/// uniqueness guard on (doctor, time) decides concurrent attempts for the
/// same slot, and the loser gets `Conflict`. The payment row is created
/// only once the slot is held.
pub async fn book_appointment(
    storage: &dyn PrectaStorage,
    checkout: &Checkout,
    actor: &Actor,
    request: BookingRequest,
    now: DateTime<Utc>,
) -> PrectaResult<Booking> {
    if request.scheduled_at <= now {
        return Err(PrectaError::invalid("Appointment time must be in the future"));
    }

    let patient = access::patient_profile(storage, actor).await?;
    let doctor = storage
        .get_doctor(&request.doctor_id)
        .await?
        .filter(|d| d.is_bookable())
        .ok_or_else(|| PrectaError::not_found("Doctor not found or not verified"))?;

    let duration_minutes = request.duration_minutes.unwrap_or(doctor.consultation_minutes);
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(PrectaError::invalid(format!(
            "Duration must be between {} and {} minutes",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        )));
    }
    if request.consultation_type == ConsultationType::Video && !doctor.offers_video {
        return Err(PrectaError::invalid("This doctor does not offer video consultations"));
    }

    let mut appointment = Appointment::from_new(
        NewAppointment {
            patient_id: patient.id.clone(),
            doctor_id: doctor.id.clone(),
            clinic_id: doctor.clinic_id.clone(),
            scheduled_at: request.scheduled_at,
            duration_minutes,
            consultation_type: request.consultation_type,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            payment_id: None,
        },
        now,
    );
    let payment = Payment::pending(
        patient.id.clone(),
        PaymentPurpose::Appointment,
        appointment.id.clone(),
        doctor.consultation_fee_cents,
        doctor.currency.clone(),
        now,
    );
    appointment.payment_id = Some(payment.id.clone());

    let appointment = match storage.insert_appointment(appointment).await {
        Ok(appointment) => appointment,
        Err(PrectaError::Conflict(message)) => {
            warn!(
                "Slot {} with doctor {} already taken",
                request.scheduled_at, doctor.id
            );
            return Err(PrectaError::Conflict(message));
        }
        Err(e) => return Err(e),
    };
    let payment = storage.insert_payment(payment).await?;

    activity::notify(
        storage,
        &doctor.user_id,
        NotificationKind::AppointmentBooked,
        "New appointment request",
        format!(
            "{} booked a {} consultation for {}",
            patient.full_name,
            appointment.consultation_type.as_str().replace('_', "-"),
            appointment.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        ),
        now,
    )
    .await;
    activity::audit(
        storage,
        Some(actor),
        "appointment.booked",
        "appointment",
        &appointment.id,
        json!({
            "doctor_id": doctor.id,
            "scheduled_at": appointment.scheduled_at,
            "consultation_type": appointment.consultation_type,
        }),
        now,
    )
    .await;

    info!(
        "Appointment {} booked with doctor {} at {}",
        appointment.id, doctor.id, appointment.scheduled_at
    );
    let checkout_url = checkout.url_for(&payment);
    Ok(Booking {
        appointment,
        payment,
        checkout_url,
    })
}

/// The calling user's appointments: as patient, or as doctor.
pub async fn my_appointments(
    storage: &dyn PrectaStorage,
    actor: &Actor,
) -> PrectaResult<Vec<Appointment>> {
    match actor.role {
        UserRole::Doctor => {
            let doctor = access::doctor_profile(storage, actor).await?;
            storage.list_appointments_for_doctor(&doctor.id).await
        }
        _ => {
            let patient = access::patient_profile(storage, actor).await?;
            storage.list_appointments_for_patient(&patient.id).await
        }
    }
}

pub async fn get_appointment(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
) -> PrectaResult<Appointment> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    access::appointment_party(storage, actor, &appointment).await?;
    Ok(appointment)
}
