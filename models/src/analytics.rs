// models/src/analytics.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub total_users: i64,
    pub total_patients: i64,
    pub total_doctors: i64,
    pub doctors_by_verification: BTreeMap<String, i64>,
    pub appointments_by_status: BTreeMap<String, i64>,
    pub revenue_cents: i64,
    pub pending_verifications: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    /// First day of the month.
    pub month: NaiveDate,
    pub new_users: i64,
    /// Change against the previous month; `None` when the previous month had no signups.
    pub growth_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub day: NaiveDate,
    pub appointments: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRanking {
    pub doctor_id: EntityId,
    pub full_name: String,
    pub specialty: String,
    pub completed_appointments: i64,
}

/// Fills in month-over-month growth for consecutive monthly counts.
pub fn with_growth(counts: Vec<(NaiveDate, i64)>) -> Vec<GrowthPoint> {
    let mut previous: Option<i64> = None;
    counts
        .into_iter()
        .map(|(month, new_users)| {
            let growth_percent = match previous {
                Some(prev) if prev > 0 => {
                    Some(((new_users - prev) as f64 / prev as f64 * 1000.0).round() / 10.0)
                }
                _ => None,
            };
            previous = Some(new_users);
            GrowthPoint { month, new_users, growth_percent }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, 1).unwrap()
    }

    #[test]
    fn growth_is_relative_to_previous_month() {
        let points = with_growth(vec![(month(1), 0), (month(2), 10), (month(3), 15), (month(4), 5)]);
        assert_eq!(points[0].growth_percent, None);
        assert_eq!(points[1].growth_percent, None);
        assert_eq!(points[2].growth_percent, Some(50.0));
        assert_eq!(points[3].growth_percent, Some(-66.7));
    }
}
