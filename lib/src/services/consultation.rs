// lib/src/services/consultation.rs

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use models::errors::{PrectaError, PrectaResult, ValidationError};
use models::{Consultation, ConsultationNotes, EntityId, Prescription, PrescriptionItem};

use super::access::{self, Actor};
use super::activity;
use crate::storage_engine::PrectaStorage;

pub const DEFAULT_PRESCRIPTION_VALID_DAYS: i64 = 30;

async fn consultation_for(
    storage: &dyn PrectaStorage,
    appointment_id: &EntityId,
) -> PrectaResult<Consultation> {
    storage
        .get_consultation_by_appointment(appointment_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Consultation not found"))
}

/// Readable by both parties of the appointment and by admins.
pub async fn get_consultation(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
) -> PrectaResult<Consultation> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    access::appointment_party(storage, actor, &appointment).await?;
    consultation_for(storage, appointment_id).await
}

pub async fn update_notes(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
    notes: ConsultationNotes,
    now: DateTime<Utc>,
) -> PrectaResult<Consultation> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    access::assigned_doctor(storage, actor, &appointment).await?;
    let consultation = consultation_for(storage, appointment_id).await?;

    let updated = storage
        .update_consultation(&consultation.id, notes, None, now)
        .await?;
    activity::audit(
        storage,
        Some(actor),
        "consultation.updated",
        "consultation",
        &updated.id,
        json!({ "appointment_id": appointment_id }),
        now,
    )
    .await;
    Ok(updated)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionRequest {
    pub items: Vec<PrescriptionItem>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Days the prescription can be filled; defaults to 30.
    #[serde(default)]
    pub valid_days: Option<i64>,
}

pub async fn issue_prescription(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
    request: PrescriptionRequest,
    now: DateTime<Utc>,
) -> PrectaResult<Prescription> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    let doctor = access::assigned_doctor(storage, actor, &appointment).await?;
    let consultation = consultation_for(storage, appointment_id).await?;

    if request.items.is_empty() {
        return Err(ValidationError::MissingField("items").into());
    }
    for item in &request.items {
        item.validate()?;
    }
    let valid_days = request.valid_days.unwrap_or(DEFAULT_PRESCRIPTION_VALID_DAYS);
    if !(1..=365).contains(&valid_days) {
        return Err(PrectaError::invalid("Validity must be between 1 and 365 days"));
    }

    let prescription = Prescription {
        id: EntityId::generate(),
        consultation_id: consultation.id.clone(),
        doctor_id: doctor.id.clone(),
        patient_id: appointment.patient_id.clone(),
        items: request.items,
        instructions: request.instructions.filter(|i| !i.trim().is_empty()),
        issued_at: now,
        valid_until: Some(now + Duration::days(valid_days)),
    };
    prescription.total_cents()?;
    let prescription = storage.insert_prescription(prescription).await?;

    activity::audit(
        storage,
        Some(actor),
        "prescription.issued",
        "prescription",
        &prescription.id,
        json!({ "consultation_id": consultation.id, "items": prescription.items.len() }),
        now,
    )
    .await;
    info!("Prescription {} issued for appointment {}", prescription.id, appointment_id);
    Ok(prescription)
}

pub async fn my_prescriptions(
    storage: &dyn PrectaStorage,
    actor: &Actor,
) -> PrectaResult<Vec<Prescription>> {
    let patient = access::patient_profile(storage, actor).await?;
    storage.list_prescriptions_for_patient(&patient.id).await
}
