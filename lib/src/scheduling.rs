// lib/src/scheduling.rs

//! Bookable slot generation.
//!
//! Candidate slots come from a doctor's weekly availability windows, which
//! are expressed in the clinic's local wall-clock time. Existing
//! slot-occupying appointments, widened by the clinic buffer, are removed,
//! and the result is clipped to the clinic's notice and advance-booking window.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use models::{Appointment, AvailabilityWindow, SchedulingSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Slot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl From<&Appointment> for Slot {
    fn from(appointment: &Appointment) -> Self {
        Slot {
            starts_at: appointment.scheduled_at,
            ends_at: appointment.ends_at(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlotRequest<'a> {
    pub windows: &'a [AvailabilityWindow],
    pub settings: SchedulingSettings,
    /// Appointments already on the doctor's calendar; non-occupying ones are ignored.
    pub booked: &'a [Appointment],
    /// First local date to consider.
    pub from: NaiveDate,
    pub days: u32,
    pub now: DateTime<Utc>,
}

/// Free slots for the requested dates, ordered by start time.
pub fn generate_slots(request: &SlotRequest<'_>) -> Vec<Slot> {
    let settings = &request.settings;
    let offset = settings.offset();
    let buffer = Duration::minutes(settings.buffer_minutes.max(0) as i64);
    let earliest = request.now + Duration::minutes(settings.min_notice_minutes.max(0) as i64);
    let horizon = request.now + Duration::days(settings.advance_booking_days.max(0) as i64);

    let occupied: Vec<&Appointment> = request
        .booked
        .iter()
        .filter(|a| a.status.occupies_slot())
        .collect();

    let mut slots = BTreeSet::new();
    for date in request.from.iter_days().take(request.days as usize) {
        for window in request.windows.iter().filter(|w| w.weekday == date.weekday()) {
            if window.slot_minutes <= 0 {
                continue;
            }
            let length = Duration::minutes(window.slot_minutes as i64);
            let step = length + buffer;

            let (Some(window_start), Some(window_end)) = (
                offset.from_local_datetime(&date.and_time(window.start_time)).single(),
                offset.from_local_datetime(&date.and_time(window.end_time)).single(),
            ) else {
                continue;
            };
            let window_start = window_start.with_timezone(&Utc);
            let window_end = window_end.with_timezone(&Utc);

            let mut cursor = window_start;
            while cursor + length <= window_end {
                let candidate = Slot {
                    starts_at: cursor,
                    ends_at: cursor + length,
                };
                if candidate.starts_at >= earliest
                    && candidate.starts_at < horizon
                    && !occupied
                        .iter()
                        .any(|a| a.overlaps(candidate.starts_at, candidate.ends_at, buffer))
                {
                    slots.insert(candidate);
                }
                cursor += step;
            }
        }
    }
    slots.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use models::{AppointmentStatus, ConsultationType, EntityId, Lifecycle, NewAppointment};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn window(weekday: Weekday, start: u32, end: u32, slot_minutes: i32) -> AvailabilityWindow {
        AvailabilityWindow {
            id: EntityId::generate(),
            doctor_id: EntityId::new("doc1".to_string()).unwrap(),
            weekday,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            slot_minutes,
        }
    }

    fn booked(start: &str, minutes: i32) -> Appointment {
        Appointment::from_new(
            NewAppointment {
                patient_id: EntityId::new("pat1".to_string()).unwrap(),
                doctor_id: EntityId::new("doc1".to_string()).unwrap(),
                clinic_id: None,
                scheduled_at: at(start),
                duration_minutes: minutes,
                consultation_type: ConsultationType::InPerson,
                notes: None,
                payment_id: None,
            },
            at("2025-05-01T00:00:00Z"),
        )
    }

    fn settings(buffer: i32, min_notice: i32) -> SchedulingSettings {
        SchedulingSettings {
            buffer_minutes: buffer,
            min_notice_minutes: min_notice,
            ..SchedulingSettings::default()
        }
    }

    fn starts(slots: &[Slot]) -> Vec<String> {
        slots.iter().map(|s| s.starts_at.format("%H:%M").to_string()).collect()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn walks_window_in_slot_steps() {
        let windows = vec![window(Weekday::Mon, 9, 12, 30)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: settings(0, 120),
            booked: &[],
            from: monday(),
            days: 1,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert_eq!(starts(&slots), ["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]);
        assert_eq!(slots[5].ends_at, at("2025-06-02T12:00:00Z"));
    }

    #[test]
    fn buffer_spaces_slots_and_widens_bookings() {
        let windows = vec![window(Weekday::Mon, 9, 12, 30)];
        let existing = vec![booked("2025-06-02T10:00:00Z", 30)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: settings(10, 0),
            booked: &existing,
            from: monday(),
            days: 1,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert_eq!(starts(&slots), ["09:00", "11:00"]);
    }

    #[test]
    fn released_bookings_do_not_block() {
        let windows = vec![window(Weekday::Mon, 9, 10, 30)];
        let mut cancelled = booked("2025-06-02T09:00:00Z", 30);
        assert!(cancelled.status.can_transition_to(AppointmentStatus::Cancelled));
        cancelled.status = AppointmentStatus::Cancelled;
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: settings(0, 0),
            booked: &[cancelled],
            from: monday(),
            days: 1,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert_eq!(starts(&slots), ["09:00", "09:30"]);
    }

    #[test]
    fn minimum_notice_hides_imminent_slots() {
        let windows = vec![window(Weekday::Mon, 9, 12, 30)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: settings(0, 120),
            booked: &[],
            from: monday(),
            days: 1,
            now: at("2025-06-02T08:00:00Z"),
        });
        assert_eq!(starts(&slots), ["10:00", "10:30", "11:00", "11:30"]);
    }

    #[test]
    fn advance_horizon_limits_range() {
        let windows = vec![window(Weekday::Mon, 9, 12, 30)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: SchedulingSettings {
                advance_booking_days: 1,
                min_notice_minutes: 0,
                ..SchedulingSettings::default()
            },
            booked: &[],
            from: monday(),
            days: 7,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert!(slots.is_empty());
    }

    #[test]
    fn local_windows_are_shifted_to_utc() {
        let windows = vec![window(Weekday::Mon, 9, 10, 30)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: SchedulingSettings {
                utc_offset_minutes: 180,
                min_notice_minutes: 0,
                ..SchedulingSettings::default()
            },
            booked: &[],
            from: monday(),
            days: 1,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert_eq!(starts(&slots), ["06:00", "06:30"]);
    }

    #[test]
    fn overlapping_windows_yield_each_slot_once() {
        let windows = vec![window(Weekday::Mon, 9, 11, 30), window(Weekday::Mon, 10, 12, 30)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: settings(0, 0),
            booked: &[],
            from: monday(),
            days: 1,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert_eq!(starts(&slots), ["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]);
    }

    #[test]
    fn only_matching_weekdays_produce_slots() {
        let windows = vec![window(Weekday::Wed, 9, 10, 60)];
        let slots = generate_slots(&SlotRequest {
            windows: &windows,
            settings: settings(0, 0),
            booked: &[],
            from: monday(),
            days: 7,
            now: at("2025-06-01T00:00:00Z"),
        });
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].starts_at, at("2025-06-04T09:00:00Z"));
    }
}
