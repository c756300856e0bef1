// lib/src/services/analytics.rs

//! Read-only dashboards for admins.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use models::analytics::with_growth;
use models::errors::{PrectaError, PrectaResult};
use models::{AuditLogEntry, DoctorRanking, GrowthPoint, PlatformMetrics, TimeseriesPoint};

use super::access::Actor;
use crate::storage_engine::PrectaStorage;

pub const DEFAULT_GROWTH_MONTHS: u32 = 6;
pub const MAX_GROWTH_MONTHS: u32 = 24;
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 20;
pub const DEFAULT_TIMESERIES_DAYS: i64 = 30;
pub const MAX_TIMESERIES_DAYS: i64 = 366;
pub const DEFAULT_TOP_DOCTORS: i64 = 10;

pub async fn metrics(storage: &dyn PrectaStorage, actor: &Actor) -> PrectaResult<PlatformMetrics> {
    actor.require_admin()?;
    storage.platform_metrics().await
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// New accounts for each of the last `months` calendar months, including
/// the current one. Months without signups are reported as zero.
pub async fn growth(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    months: Option<u32>,
    now: DateTime<Utc>,
) -> PrectaResult<Vec<GrowthPoint>> {
    actor.require_admin()?;
    let months = months.unwrap_or(DEFAULT_GROWTH_MONTHS).clamp(1, MAX_GROWTH_MONTHS);
    let current = month_start(now.date_naive());
    let since = current
        .checked_sub_months(Months::new(months - 1))
        .ok_or_else(|| PrectaError::invalid("Growth range is out of bounds"))?;

    let counts: BTreeMap<NaiveDate, i64> = storage.signups_by_month(since).await?.into_iter().collect();
    let mut dense = Vec::with_capacity(months as usize);
    let mut month = since;
    while month <= current {
        dense.push((month, counts.get(&month).copied().unwrap_or(0)));
        month = match month.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(with_growth(dense))
}

pub async fn activity(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    limit: Option<i64>,
) -> PrectaResult<Vec<AuditLogEntry>> {
    actor.require_admin()?;
    let limit = limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, 200);
    storage.list_recent_audit_logs(limit).await
}

/// Appointments booked per day in `[from, to]`, one point per day.
pub async fn timeseries(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> PrectaResult<Vec<TimeseriesPoint>> {
    actor.require_admin()?;
    let to = to.unwrap_or_else(|| now.date_naive());
    let from = from.unwrap_or(to - Duration::days(DEFAULT_TIMESERIES_DAYS - 1));
    if from > to {
        return Err(PrectaError::invalid("'from' must not be after 'to'"));
    }
    if (to - from).num_days() >= MAX_TIMESERIES_DAYS {
        return Err(PrectaError::invalid(format!(
            "Timeseries range cannot exceed {} days",
            MAX_TIMESERIES_DAYS
        )));
    }

    let counts: BTreeMap<NaiveDate, i64> =
        storage.appointments_by_day(from, to).await?.into_iter().collect();
    Ok(from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|day| TimeseriesPoint {
            day,
            appointments: counts.get(&day).copied().unwrap_or(0),
        })
        .collect())
}

pub async fn top_doctors(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    limit: Option<i64>,
) -> PrectaResult<Vec<DoctorRanking>> {
    actor.require_admin()?;
    storage
        .top_doctors(limit.unwrap_or(DEFAULT_TOP_DOCTORS).clamp(1, 100))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lifecycle::{complete_appointment, start_appointment};
    use crate::services::testing::{at, Fixture};

    #[tokio::test]
    async fn dashboards_are_admin_only() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        for actor in [&fixture.patient_actor, &fixture.doctor_actor] {
            assert!(matches!(metrics(&fixture.storage, actor).await, Err(PrectaError::Forbidden(_))));
            assert!(growth(&fixture.storage, actor, None, now).await.is_err());
            assert!(activity(&fixture.storage, actor, None).await.is_err());
            assert!(timeseries(&fixture.storage, actor, None, None, now).await.is_err());
            assert!(top_doctors(&fixture.storage, actor, None).await.is_err());
        }
    }

    #[tokio::test]
    async fn metrics_count_revenue_and_pending_verifications() {
        let fixture = Fixture::new().await;
        fixture.confirmed("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        fixture.book("2025-06-01T11:00:00Z", at("2025-05-30T08:00:00Z")).await;

        let m = metrics(&fixture.storage, &fixture.admin_actor).await.unwrap();
        assert_eq!(m.total_users, 6);
        assert_eq!(m.total_patients, 2);
        assert_eq!(m.total_doctors, 3);
        assert_eq!(m.pending_verifications, 1);
        assert_eq!(m.doctors_by_verification["verified"], 2);
        assert_eq!(m.appointments_by_status["confirmed"], 1);
        assert_eq!(m.appointments_by_status["pending_payment"], 1);
        assert_eq!(m.appointments_by_status["cancelled"], 0);
        assert_eq!(m.revenue_cents, 250_000);
    }

    #[tokio::test]
    async fn growth_fills_empty_months() {
        let fixture = Fixture::new().await;
        let points = growth(&fixture.storage, &fixture.admin_actor, Some(3), at("2025-03-10T00:00:00Z"))
            .await
            .unwrap();
        let months: Vec<u32> = points.iter().map(|p| p.month.month()).collect();
        assert_eq!(months, vec![1, 2, 3]);
        assert_eq!(points[0].new_users, 6);
        assert_eq!(points[1].new_users, 0);
        assert_eq!(points[1].growth_percent, Some(-100.0));
        assert_eq!(points[2].growth_percent, None);
    }

    #[tokio::test]
    async fn timeseries_has_a_point_per_day() {
        let fixture = Fixture::new().await;
        fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        fixture.book("2025-06-01T11:00:00Z", at("2025-05-30T09:00:00Z")).await;

        let from = NaiveDate::from_ymd_opt(2025, 5, 28);
        let to = NaiveDate::from_ymd_opt(2025, 5, 31);
        let points = timeseries(&fixture.storage, &fixture.admin_actor, from, to, at("2025-06-01T00:00:00Z"))
            .await
            .unwrap();
        let counts: Vec<i64> = points.iter().map(|p| p.appointments).collect();
        assert_eq!(counts, vec![0, 0, 2, 0]);

        let err = timeseries(&fixture.storage, &fixture.admin_actor, to, from, at("2025-06-01T00:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Validation(_)));
    }

    #[tokio::test]
    async fn top_doctors_rank_completed_visits() {
        let fixture = Fixture::new().await;
        let appointment = fixture.confirmed("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        start_appointment(&fixture.storage, &fixture.doctor_actor, &appointment.id, at("2025-06-01T10:00:00Z"))
            .await
            .unwrap();
        complete_appointment(&fixture.storage, &fixture.doctor_actor, &appointment.id, at("2025-06-01T10:30:00Z"))
            .await
            .unwrap();

        let top = top_doctors(&fixture.storage, &fixture.admin_actor, Some(5)).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].doctor_id, fixture.doctor.id);
        assert_eq!(top[0].completed_appointments, 1);

        let recent = activity(&fixture.storage, &fixture.admin_actor, Some(1)).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}
