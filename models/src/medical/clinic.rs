// models/src/medical/clinic.rs

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::EntityId;

pub const DEFAULT_BUFFER_MINUTES: i32 = 0;
pub const DEFAULT_ADVANCE_BOOKING_DAYS: i32 = 60;
pub const DEFAULT_MIN_NOTICE_MINUTES: i32 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: EntityId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    #[serde(flatten)]
    pub settings: SchedulingSettings,
    pub created_at: DateTime<Utc>,
}

/// Booking-window configuration a clinic applies to all of its doctors.
/// Doctors without a clinic use `SchedulingSettings::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingSettings {
    /// Offset of the clinic's wall clock from UTC; availability windows are in local time.
    pub utc_offset_minutes: i32,
    /// Gap kept free before and after every appointment.
    pub buffer_minutes: i32,
    /// How far ahead patients may book.
    pub advance_booking_days: i32,
    /// Minimum lead time between now and a bookable slot.
    pub min_notice_minutes: i32,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        SchedulingSettings {
            utc_offset_minutes: 0,
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            advance_booking_days: DEFAULT_ADVANCE_BOOKING_DAYS,
            min_notice_minutes: DEFAULT_MIN_NOTICE_MINUTES,
        }
    }
}

impl SchedulingSettings {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

/// A recurring weekly block in which a doctor sees patients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: EntityId,
    pub doctor_id: EntityId,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

/// A window as submitted by the doctor, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAvailabilityWindow {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

impl NewAvailabilityWindow {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.end_time <= self.start_time {
            return Err(ValidationError::InvalidValue(format!(
                "Availability on {} must end after it starts",
                self.weekday
            )));
        }
        if !(5..=240).contains(&self.slot_minutes) {
            return Err(ValidationError::InvalidValue(
                "Slot length must be between 5 and 240 minutes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_window(self, doctor_id: EntityId) -> AvailabilityWindow {
        AvailabilityWindow {
            id: EntityId::generate(),
            doctor_id,
            weekday: self.weekday,
            start_time: self.start_time,
            end_time: self.end_time,
            slot_minutes: self.slot_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: (u32, u32), end: (u32, u32), slot: i32) -> NewAvailabilityWindow {
        NewAvailabilityWindow {
            weekday: Weekday::Mon,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            slot_minutes: slot,
        }
    }

    #[test]
    fn rejects_inverted_window() {
        assert!(window((12, 0), (9, 0), 30).validate().is_err());
        assert!(window((9, 0), (9, 0), 30).validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_slot_length() {
        assert!(window((9, 0), (12, 0), 0).validate().is_err());
        assert!(window((9, 0), (12, 0), 300).validate().is_err());
        assert!(window((9, 0), (12, 0), 30).validate().is_ok());
    }

    #[test]
    fn weekday_accepts_full_names() {
        let parsed: NewAvailabilityWindow = serde_json::from_str(
            r#"{"weekday":"Tuesday","start_time":"09:00:00","end_time":"12:00:00","slot_minutes":30}"#,
        )
        .unwrap();
        assert_eq!(parsed.weekday, Weekday::Tue);
    }
}
