// lib/src/services/profiles.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use models::errors::{PrectaError, PrectaResult, ValidationError};
use models::{
    AvailabilityWindow, Doctor, EntityId, NewAvailabilityWindow, NewPatient, Patient, UserRole,
};

use super::access::{self, Actor};
use super::activity;
use crate::storage_engine::PrectaStorage;

#[derive(Debug, Clone, Deserialize)]
pub struct PatientProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn create_patient_profile(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    request: PatientProfileRequest,
    now: DateTime<Utc>,
) -> PrectaResult<Patient> {
    actor.require_role(UserRole::Patient)?;
    let full_name = request.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ValidationError::MissingField("full_name").into());
    }
    if request.date_of_birth.is_some_and(|dob| dob > now.date_naive()) {
        return Err(PrectaError::invalid("Date of birth cannot be in the future"));
    }

    let patient = storage
        .insert_patient(Patient::from_new(
            NewPatient {
                user_id: actor.user_id.clone(),
                full_name,
                date_of_birth: request.date_of_birth,
                gender: non_blank(request.gender),
                phone: non_blank(request.phone),
                address: non_blank(request.address),
            },
            now,
        ))
        .await?;
    activity::audit(
        storage,
        Some(actor),
        "patient.created",
        "patient",
        &patient.id,
        json!({}),
        now,
    )
    .await;
    Ok(patient)
}

/// A verified doctor's public profile. Unverified doctors are invisible.
pub async fn get_doctor_public(
    storage: &dyn PrectaStorage,
    doctor_id: &EntityId,
) -> PrectaResult<Doctor> {
    storage
        .get_doctor(doctor_id)
        .await?
        .filter(Doctor::is_bookable)
        .ok_or_else(|| PrectaError::not_found("Doctor not found"))
}

pub async fn get_availability(
    storage: &dyn PrectaStorage,
    doctor_id: &EntityId,
) -> PrectaResult<Vec<AvailabilityWindow>> {
    let doctor = get_doctor_public(storage, doctor_id).await?;
    storage.list_availability(&doctor.id).await
}

/// Replaces the calling doctor's weekly schedule. Windows on the same
/// weekday must not overlap.
pub async fn set_my_availability(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    windows: Vec<NewAvailabilityWindow>,
    now: DateTime<Utc>,
) -> PrectaResult<Vec<AvailabilityWindow>> {
    actor.require_role(UserRole::Doctor)?;
    let doctor = access::doctor_profile(storage, actor).await?;

    for window in &windows {
        window.validate()?;
    }
    let mut sorted: Vec<&NewAvailabilityWindow> = windows.iter().collect();
    sorted.sort_by_key(|w| (w.weekday.num_days_from_monday(), w.start_time));
    for pair in sorted.windows(2) {
        if pair[0].weekday == pair[1].weekday && pair[1].start_time < pair[0].end_time {
            return Err(PrectaError::invalid(format!(
                "Availability windows on {} overlap",
                pair[0].weekday
            )));
        }
    }

    let stored = storage
        .replace_availability(
            &doctor.id,
            windows
                .into_iter()
                .map(|w| w.into_window(doctor.id.clone()))
                .collect(),
        )
        .await?;
    activity::audit(
        storage,
        Some(actor),
        "availability.replaced",
        "doctor",
        &doctor.id,
        json!({ "windows": stored.len() }),
        now,
    )
    .await;
    info!("Doctor {} now has {} availability windows", doctor.id, stored.len());
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{at, seed_user, Fixture};
    use chrono::{NaiveTime, Weekday};

    fn window(weekday: Weekday, start: u32, end: u32) -> NewAvailabilityWindow {
        NewAvailabilityWindow {
            weekday,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            slot_minutes: 30,
        }
    }

    #[tokio::test]
    async fn patient_profile_is_created_once() {
        let fixture = Fixture::new().await;
        let actor = seed_user(&fixture.storage, "user-new-patient", UserRole::Patient).await;
        let request = || PatientProfileRequest {
            full_name: " Zawadi Mwangi ".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12),
            gender: Some("".to_string()),
            phone: Some("+254700000000".to_string()),
            address: None,
        };

        let patient = create_patient_profile(&fixture.storage, &actor, request(), at("2025-03-01T10:00:00Z"))
            .await
            .unwrap();
        assert_eq!(patient.full_name, "Zawadi Mwangi");
        assert_eq!(patient.gender, None);

        let err = create_patient_profile(&fixture.storage, &actor, request(), at("2025-03-01T10:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Conflict(_)));
    }

    #[tokio::test]
    async fn unverified_doctors_are_hidden() {
        let fixture = Fixture::new().await;
        assert!(get_doctor_public(&fixture.storage, &fixture.doctor.id).await.is_ok());
        let err = get_doctor_public(&fixture.storage, &fixture.pending_doctor.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Doctor not found");
    }

    #[tokio::test]
    async fn doctor_replaces_weekly_schedule() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        set_my_availability(
            &fixture.storage,
            &fixture.doctor_actor,
            vec![window(Weekday::Mon, 9, 12), window(Weekday::Wed, 14, 17)],
            now,
        )
        .await
        .unwrap();
        let stored = set_my_availability(
            &fixture.storage,
            &fixture.doctor_actor,
            vec![window(Weekday::Fri, 14, 17), window(Weekday::Mon, 9, 12)],
            now,
        )
        .await
        .unwrap();
        assert_eq!(stored.len(), 2);

        let public = get_availability(&fixture.storage, &fixture.doctor.id).await.unwrap();
        let days: Vec<Weekday> = public.iter().map(|w| w.weekday).collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Fri]);
    }

    #[tokio::test]
    async fn overlapping_or_foreign_schedules_are_refused() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let err = set_my_availability(
            &fixture.storage,
            &fixture.doctor_actor,
            vec![window(Weekday::Mon, 9, 12), window(Weekday::Mon, 11, 13)],
            now,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));

        let err = set_my_availability(&fixture.storage, &fixture.patient_actor, vec![], now)
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));
    }
}
