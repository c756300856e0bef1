// lib/src/services/verification.rs

//! Doctor credential review. A doctor enters the queue as `pending` and an
//! admin decides once; there is no path back to `pending`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use models::errors::{PrectaError, PrectaResult, ValidationError};
use models::{
    Doctor, EntityId, NewDoctor, NotificationKind, UserRole, VerificationDecision,
    VerificationStatus,
};

use super::access::Actor;
use super::activity;
use crate::storage_engine::PrectaStorage;

pub const DEFAULT_CONSULTATION_MINUTES: i32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorProfileRequest {
    #[serde(default)]
    pub clinic_id: Option<EntityId>,
    pub full_name: String,
    pub specialty: String,
    pub license_number: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub consultation_fee_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub consultation_minutes: Option<i32>,
    #[serde(default)]
    pub offers_video: bool,
}

fn required(value: String, field: &'static str) -> PrectaResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field).into());
    }
    Ok(value)
}

/// Creates the caller's doctor profile in the verification queue.
pub async fn submit_doctor_profile(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    request: DoctorProfileRequest,
    default_currency: &str,
    now: DateTime<Utc>,
) -> PrectaResult<Doctor> {
    actor.require_role(UserRole::Doctor)?;

    let full_name = required(request.full_name, "full_name")?;
    let specialty = required(request.specialty, "specialty")?;
    let license_number = required(request.license_number, "license_number")?;
    if request.consultation_fee_cents < 0 {
        return Err(PrectaError::invalid("Consultation fee cannot be negative"));
    }
    let consultation_minutes = request
        .consultation_minutes
        .unwrap_or(DEFAULT_CONSULTATION_MINUTES);
    if !(5..=240).contains(&consultation_minutes) {
        return Err(PrectaError::invalid(
            "Consultation length must be between 5 and 240 minutes",
        ));
    }
    if let Some(clinic_id) = &request.clinic_id {
        if storage.get_clinic(clinic_id).await?.is_none() {
            return Err(PrectaError::not_found("Clinic not found"));
        }
    }

    let doctor = Doctor::from_new(
        NewDoctor {
            user_id: actor.user_id.clone(),
            clinic_id: request.clinic_id,
            full_name,
            specialty,
            license_number,
            bio: request.bio.filter(|b| !b.trim().is_empty()),
            consultation_fee_cents: request.consultation_fee_cents,
            currency: request
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| default_currency.to_string()),
            consultation_minutes,
            offers_video: request.offers_video,
        },
        now,
    );
    let doctor = storage.insert_doctor(doctor).await?;
    activity::audit(
        storage,
        Some(actor),
        "doctor.submitted",
        "doctor",
        &doctor.id,
        json!({ "license_number": doctor.license_number }),
        now,
    )
    .await;
    info!("Doctor {} submitted for verification", doctor.id);
    Ok(doctor)
}

pub async fn list_pending(storage: &dyn PrectaStorage, actor: &Actor) -> PrectaResult<Vec<Doctor>> {
    actor.require_admin()?;
    storage
        .list_doctors_by_verification(VerificationStatus::Pending)
        .await
}

pub async fn get_verification(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    doctor_id: &EntityId,
) -> PrectaResult<Doctor> {
    actor.require_admin()?;
    storage
        .get_doctor(doctor_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Doctor not found"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

async fn decide(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    doctor_id: &EntityId,
    decision: VerificationDecision,
    now: DateTime<Utc>,
) -> PrectaResult<Doctor> {
    let doctor = storage
        .decide_verification(doctor_id, &decision)
        .await?
        .ok_or_else(|| PrectaError::not_found("Doctor not found"))?;

    let body = match &decision {
        VerificationDecision::Approve { .. } => {
            "Your profile has been verified and is now visible to patients".to_string()
        }
        VerificationDecision::Reject { reason, .. } => {
            format!("Your verification was not approved: {}", reason)
        }
    };
    activity::notify(
        storage,
        &doctor.user_id,
        NotificationKind::VerificationDecided,
        "Verification decision",
        body,
        now,
    )
    .await;
    activity::audit(
        storage,
        Some(actor),
        &format!("doctor.{}", doctor.verification_status),
        "doctor",
        &doctor.id,
        json!({ "rejection_reason": doctor.rejection_reason }),
        now,
    )
    .await;
    Ok(doctor)
}

pub async fn approve(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    doctor_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<Doctor> {
    actor.require_admin()?;
    let decision = VerificationDecision::Approve {
        moderator_id: actor.user_id.clone(),
        decided_at: now,
    };
    let doctor = decide(storage, actor, doctor_id, decision, now).await?;
    info!("Doctor {} verified by {}; now discoverable", doctor.id, actor.user_id);
    Ok(doctor)
}

pub async fn reject(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    doctor_id: &EntityId,
    request: RejectRequest,
    now: DateTime<Utc>,
) -> PrectaResult<Doctor> {
    actor.require_admin()?;
    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or(ValidationError::MissingField("reason"))?;
    let decision = VerificationDecision::Reject {
        moderator_id: actor.user_id.clone(),
        reason,
        decided_at: now,
    };
    let doctor = decide(storage, actor, doctor_id, decision, now).await?;
    info!("Doctor {} rejected by {}", doctor.id, actor.user_id);
    Ok(doctor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::booking::{book_appointment, BookingRequest};
    use crate::services::testing::{at, id, seed_user, Fixture};
    use crate::storage_engine::{ActivityStore, DirectoryStore};
    use models::ConsultationType;

    fn application() -> DoctorProfileRequest {
        DoctorProfileRequest {
            clinic_id: None,
            full_name: "Dr. Wairimu".to_string(),
            specialty: "Dermatology".to_string(),
            license_number: "KMPDC-7781".to_string(),
            bio: None,
            consultation_fee_cents: 300_000,
            currency: None,
            consultation_minutes: None,
            offers_video: true,
        }
    }

    async fn applicant(fixture: &Fixture) -> (Actor, Doctor) {
        let actor = seed_user(&fixture.storage, "user-applicant", UserRole::Doctor).await;
        let doctor = submit_doctor_profile(&fixture.storage, &actor, application(), "KES", at("2025-02-01T10:00:00Z"))
            .await
            .unwrap();
        (actor, doctor)
    }

    #[tokio::test]
    async fn submitted_profile_waits_in_queue() {
        let fixture = Fixture::new().await;
        let (_, doctor) = applicant(&fixture).await;
        assert_eq!(doctor.verification_status, VerificationStatus::Pending);
        assert_eq!(doctor.currency, "KES");
        assert_eq!(doctor.consultation_minutes, 30);

        let pending = list_pending(&fixture.storage, &fixture.admin_actor).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|d| d.id.clone()).collect();
        assert!(ids.contains(&doctor.id));
        assert!(ids.contains(&fixture.pending_doctor.id));

        let err = list_pending(&fixture.storage, &fixture.doctor_actor).await.unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));
    }

    #[tokio::test]
    async fn patients_cannot_apply_and_blank_fields_fail() {
        let fixture = Fixture::new().await;
        let err = submit_doctor_profile(&fixture.storage, &fixture.patient_actor, application(), "KES", at("2025-02-01T10:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));

        let mut request = application();
        request.license_number = "  ".to_string();
        let actor = Actor::new(id("user-applicant"), UserRole::Doctor);
        let err = submit_doctor_profile(&fixture.storage, &actor, request, "KES", at("2025-02-01T10:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "license_number is required");
    }

    #[tokio::test]
    async fn approval_makes_doctor_bookable_once() {
        let fixture = Fixture::new().await;
        let doctor_id = fixture.pending_doctor.id.clone();
        let request = || BookingRequest {
            doctor_id: doctor_id.clone(),
            scheduled_at: at("2025-06-01T10:00:00Z"),
            consultation_type: ConsultationType::Video,
            duration_minutes: None,
            notes: None,
        };

        let err = book_appointment(&fixture.storage, &fixture.checkout, &fixture.patient_actor, request(), at("2025-05-30T08:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Doctor not found or not verified");

        let approved = approve(&fixture.storage, &fixture.admin_actor, &doctor_id, at("2025-05-30T09:00:00Z"))
            .await
            .unwrap();
        assert_eq!(approved.verification_status, VerificationStatus::Verified);
        assert_eq!(approved.verified_at, Some(at("2025-05-30T09:00:00Z")));
        assert_eq!(approved.verified_by.as_ref(), Some(&fixture.admin_actor.user_id));

        book_appointment(&fixture.storage, &fixture.checkout, &fixture.patient_actor, request(), at("2025-05-30T10:00:00Z"))
            .await
            .unwrap();

        let err = approve(&fixture.storage, &fixture.admin_actor, &doctor_id, at("2025-05-30T11:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Verification already decided");
        let err = reject(
            &fixture.storage,
            &fixture.admin_actor,
            &doctor_id,
            RejectRequest { reason: Some("Too late".to_string()) },
            at("2025-05-30T11:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Conflict(_)));

        let notes = fixture
            .storage
            .list_notifications(&fixture.pending_doctor_actor.user_id, 10)
            .await
            .unwrap();
        assert!(notes.iter().any(|n| n.kind == NotificationKind::VerificationDecided));
    }

    #[tokio::test]
    async fn rejection_needs_reason_and_is_final() {
        let fixture = Fixture::new().await;
        let doctor_id = fixture.pending_doctor.id.clone();

        let err = reject(&fixture.storage, &fixture.admin_actor, &doctor_id, RejectRequest::default(), at("2025-05-30T09:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "reason is required");

        let rejected = reject(
            &fixture.storage,
            &fixture.admin_actor,
            &doctor_id,
            RejectRequest { reason: Some("License number could not be matched".to_string()) },
            at("2025-05-30T09:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(rejected.verification_status, VerificationStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("License number could not be matched"));

        let err = approve(&fixture.storage, &fixture.admin_actor, &doctor_id, at("2025-05-30T10:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Conflict(_)));
        let stored = fixture.storage.get_doctor(&doctor_id).await.unwrap().unwrap();
        assert_eq!(stored.verification_status, VerificationStatus::Rejected);
    }

    #[tokio::test]
    async fn unknown_doctor_is_not_found() {
        let fixture = Fixture::new().await;
        let err = approve(&fixture.storage, &fixture.admin_actor, &id("nobody"), at("2025-05-30T09:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Doctor not found");
    }
}
