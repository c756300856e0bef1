// lib/src/services/records.rs

//! Patient-owned medical records and per-doctor read grants.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use models::errors::{PrectaError, PrectaResult, ValidationError};
use models::{EntityId, MedicalRecord, RecordType, UserRole};

use super::access::{self, Actor};
use super::activity;
use crate::storage_engine::PrectaStorage;

#[derive(Debug, Clone, Deserialize)]
pub struct RecordRequest {
    pub title: String,
    pub record_type: RecordType,
    #[serde(default)]
    pub description: Option<String>,
    /// Location of the uploaded file in external storage.
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub recorded_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareRequest {
    pub doctor_id: EntityId,
}

pub async fn create_record(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    request: RecordRequest,
    now: DateTime<Utc>,
) -> PrectaResult<MedicalRecord> {
    let patient = access::patient_profile(storage, actor).await?;
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ValidationError::MissingField("title").into());
    }
    if let Some(url) = &request.file_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(PrectaError::invalid("file_url must be an http(s) URL"));
        }
    }

    let record = storage
        .insert_record(MedicalRecord {
            id: EntityId::generate(),
            patient_id: patient.id,
            title,
            record_type: request.record_type,
            description: request.description.filter(|d| !d.trim().is_empty()),
            file_url: request.file_url,
            recorded_on: request.recorded_on,
            shared_with: Vec::new(),
            created_at: now,
        })
        .await?;
    activity::audit(
        storage,
        Some(actor),
        "record.created",
        "medical_record",
        &record.id,
        json!({ "record_type": record.record_type }),
        now,
    )
    .await;
    Ok(record)
}

pub async fn my_records(storage: &dyn PrectaStorage, actor: &Actor) -> PrectaResult<Vec<MedicalRecord>> {
    let patient = access::patient_profile(storage, actor).await?;
    storage.list_records_for_patient(&patient.id).await
}

async fn load_record(storage: &dyn PrectaStorage, record_id: &EntityId) -> PrectaResult<MedicalRecord> {
    storage
        .get_record(record_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Record not found"))
}

/// Loads a record the actor owns. Records of other patients are reported as
/// missing rather than forbidden.
async fn owned_record(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    record_id: &EntityId,
) -> PrectaResult<MedicalRecord> {
    let patient = access::patient_profile(storage, actor).await?;
    let record = load_record(storage, record_id).await?;
    if record.patient_id != patient.id {
        return Err(PrectaError::not_found("Record not found"));
    }
    Ok(record)
}

/// Owner, admins, and doctors the record is currently shared with. Other
/// patients get `NotFound`.
pub async fn get_record(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    record_id: &EntityId,
) -> PrectaResult<MedicalRecord> {
    let record = load_record(storage, record_id).await?;
    let allowed = match actor.role {
        UserRole::Admin => true,
        UserRole::Patient => {
            let owns = storage
                .get_patient_by_user(&actor.user_id)
                .await?
                .is_some_and(|p| p.id == record.patient_id);
            if !owns {
                return Err(PrectaError::not_found("Record not found"));
            }
            true
        }
        UserRole::Doctor => storage
            .get_doctor_by_user(&actor.user_id)
            .await?
            .is_some_and(|d| record.is_shared_with(&d.id)),
    };
    if !allowed {
        return Err(PrectaError::forbidden("You do not have access to this record"));
    }
    Ok(record)
}

pub async fn delete_record(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    record_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<()> {
    let record = owned_record(storage, actor, record_id).await?;
    if !storage.delete_record(&record.id).await? {
        return Err(PrectaError::not_found("Record not found"));
    }
    activity::audit(
        storage,
        Some(actor),
        "record.deleted",
        "medical_record",
        &record.id,
        json!({ "title": record.title }),
        now,
    )
    .await;
    Ok(())
}

pub async fn share_record(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    record_id: &EntityId,
    request: ShareRequest,
    now: DateTime<Utc>,
) -> PrectaResult<MedicalRecord> {
    let record = owned_record(storage, actor, record_id).await?;
    let doctor = storage
        .get_doctor(&request.doctor_id)
        .await?
        .filter(|d| d.is_bookable())
        .ok_or_else(|| PrectaError::not_found("Doctor not found or not verified"))?;

    let shared = storage.share_record(&record.id, &doctor.id).await?;
    activity::audit(
        storage,
        Some(actor),
        "record.shared",
        "medical_record",
        &shared.id,
        json!({ "doctor_id": doctor.id }),
        now,
    )
    .await;
    info!("Record {} shared with doctor {}", shared.id, doctor.id);
    Ok(shared)
}

pub async fn revoke_record(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    record_id: &EntityId,
    request: ShareRequest,
    now: DateTime<Utc>,
) -> PrectaResult<MedicalRecord> {
    let record = owned_record(storage, actor, record_id).await?;
    let revoked = storage.revoke_record(&record.id, &request.doctor_id).await?;
    activity::audit(
        storage,
        Some(actor),
        "record.revoked",
        "medical_record",
        &revoked.id,
        json!({ "doctor_id": request.doctor_id }),
        now,
    )
    .await;
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{at, Fixture};

    fn blood_panel() -> RecordRequest {
        RecordRequest {
            title: "Full blood count".to_string(),
            record_type: RecordType::LabResult,
            description: Some("Fasting sample".to_string()),
            file_url: Some("https://files.precta.test/fbc.pdf".to_string()),
            recorded_on: NaiveDate::from_ymd_opt(2025, 5, 20),
        }
    }

    #[tokio::test]
    async fn doctor_reads_only_while_shared() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let record = create_record(&fixture.storage, &fixture.patient_actor, blood_panel(), now)
            .await
            .unwrap();

        let err = get_record(&fixture.storage, &fixture.doctor_actor, &record.id).await.unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));

        let share = || ShareRequest { doctor_id: fixture.doctor.id.clone() };
        let shared = share_record(&fixture.storage, &fixture.patient_actor, &record.id, share(), now)
            .await
            .unwrap();
        assert_eq!(shared.shared_with, vec![fixture.doctor.id.clone()]);
        share_record(&fixture.storage, &fixture.patient_actor, &record.id, share(), now)
            .await
            .unwrap();

        let seen = get_record(&fixture.storage, &fixture.doctor_actor, &record.id).await.unwrap();
        assert_eq!(seen.title, "Full blood count");
        let err = get_record(&fixture.storage, &fixture.in_person_doctor_actor, &record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));

        let revoked = revoke_record(&fixture.storage, &fixture.patient_actor, &record.id, share(), now)
            .await
            .unwrap();
        assert!(revoked.shared_with.is_empty());
        assert!(get_record(&fixture.storage, &fixture.doctor_actor, &record.id).await.is_err());
        assert!(get_record(&fixture.storage, &fixture.admin_actor, &record.id).await.is_ok());
    }

    #[tokio::test]
    async fn records_stay_with_their_owner() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let record = create_record(&fixture.storage, &fixture.patient_actor, blood_panel(), now)
            .await
            .unwrap();

        assert!(my_records(&fixture.storage, &fixture.other_patient_actor).await.unwrap().is_empty());
        let err = get_record(&fixture.storage, &fixture.other_patient_actor, &record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::NotFound(_)));
        assert_eq!(err.to_string(), "Record not found");
        let err = delete_record(&fixture.storage, &fixture.other_patient_actor, &record.id, now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Record not found");

        delete_record(&fixture.storage, &fixture.patient_actor, &record.id, now).await.unwrap();
        assert!(my_records(&fixture.storage, &fixture.patient_actor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sharing_requires_verified_doctor() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let record = create_record(&fixture.storage, &fixture.patient_actor, blood_panel(), now)
            .await
            .unwrap();
        let err = share_record(
            &fixture.storage,
            &fixture.patient_actor,
            &record.id,
            ShareRequest { doctor_id: fixture.pending_doctor.id.clone() },
            now,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Doctor not found or not verified");
    }

    #[tokio::test]
    async fn blank_title_and_odd_urls_are_rejected() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let mut request = blood_panel();
        request.title = " ".to_string();
        let err = create_record(&fixture.storage, &fixture.patient_actor, request, now).await.unwrap_err();
        assert_eq!(err.to_string(), "title is required");

        let mut request = blood_panel();
        request.file_url = Some("file:///etc/passwd".to_string());
        assert!(create_record(&fixture.storage, &fixture.patient_actor, request, now).await.is_err());
    }
}
