// lib/src/services/slots.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use models::errors::{PrectaError, PrectaResult};
use models::{EntityId, SchedulingSettings};

use crate::scheduling::{generate_slots, Slot, SlotRequest};
use crate::storage_engine::PrectaStorage;

pub const DEFAULT_SLOT_DAYS: u32 = 7;
pub const MAX_SLOT_DAYS: u32 = 31;

/// The calendar view of one doctor: what is taken and what can be booked.
#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub doctor_id: EntityId,
    pub from: NaiveDate,
    pub days: u32,
    pub booked: Vec<Slot>,
    pub available: Vec<Slot>,
}

pub async fn doctor_slots(
    storage: &dyn PrectaStorage,
    doctor_id: &EntityId,
    from: Option<NaiveDate>,
    days: Option<u32>,
    now: DateTime<Utc>,
) -> PrectaResult<SlotAvailability> {
    let doctor = storage
        .get_doctor(doctor_id)
        .await?
        .filter(|d| d.is_bookable())
        .ok_or_else(|| PrectaError::not_found("Doctor not found or not verified"))?;

    let settings = match &doctor.clinic_id {
        Some(clinic_id) => storage
            .get_clinic(clinic_id)
            .await?
            .map(|c| c.settings)
            .unwrap_or_default(),
        None => SchedulingSettings::default(),
    };
    let from = from.unwrap_or_else(|| now.with_timezone(&settings.offset()).date_naive());
    let days = days.unwrap_or(DEFAULT_SLOT_DAYS).clamp(1, MAX_SLOT_DAYS);

    // Local dates can start up to a day either side of the UTC date.
    let range_start = from.and_time(NaiveTime::MIN).and_utc() - Duration::days(1);
    let range_end = range_start + Duration::days(days as i64 + 2);

    let windows = storage.list_availability(&doctor.id).await?;
    let booked = storage
        .list_booked_between(&doctor.id, range_start, range_end)
        .await?;
    let available = generate_slots(&SlotRequest {
        windows: &windows,
        settings,
        booked: &booked,
        from,
        days,
        now,
    });

    let offset = settings.offset();
    let until = from + Duration::days(days as i64);
    let booked = booked
        .iter()
        .filter(|a| {
            let local = a.scheduled_at.with_timezone(&offset).date_naive();
            local >= from && local < until
        })
        .map(Slot::from)
        .collect();

    Ok(SlotAvailability {
        doctor_id: doctor.id,
        from,
        days,
        booked,
        available,
    })
}
