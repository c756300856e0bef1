// lib/src/services/cancellation.rs

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use models::errors::{PrectaError, PrectaResult};
use models::{Appointment, AppointmentStatus, Cancellation, EntityId, Lifecycle, NotificationKind};

use super::access::{self, Actor, Party};
use super::{activity, lifecycle, payments};
use crate::storage_engine::PrectaStorage;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Human form of the cancellation notice, e.g. "2 hours" or "45 minutes".
pub fn describe_notice(notice: Duration) -> String {
    let minutes = notice.num_minutes();
    match (minutes / 60, minutes % 60) {
        (1, 0) => "1 hour".to_string(),
        (hours, 0) if hours > 0 => format!("{} hours", hours),
        _ => format!("{} minutes", minutes),
    }
}

/// Cancels an appointment on behalf of its patient, its doctor or an admin.
///
/// Cancellation closes once fewer than `notice` remain before the scheduled
/// start. A collected payment is refunded.
pub async fn cancel_appointment(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
    request: CancelRequest,
    notice: Duration,
    now: DateTime<Utc>,
) -> PrectaResult<Appointment> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    let party = access::appointment_party(storage, actor, &appointment).await?;

    appointment.status.ensure_transition(AppointmentStatus::Cancelled)?;
    if appointment.scheduled_at - now < notice {
        return Err(PrectaError::invalid(format!(
            "Appointments can only be cancelled at least {} before the scheduled time",
            describe_notice(notice)
        )));
    }

    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reason given".to_string());
    let cancelled = storage
        .update_appointment_status(
            &appointment.id,
            appointment.status,
            AppointmentStatus::Cancelled,
            Some(Cancellation {
                reason: reason.clone(),
                cancelled_by: actor.user_id.clone(),
                cancelled_at: now,
            }),
            now,
        )
        .await?;

    let refunded = payments::refund_if_collected(storage, cancelled.payment_id.as_ref(), now).await?;

    let (patient, doctor) = lifecycle::participants(storage, &cancelled).await?;
    let body = format!(
        "The appointment on {} was cancelled: {}",
        cancelled.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
        reason
    );
    let recipients = match party {
        Party::Patient(_) => vec![doctor.user_id],
        Party::Doctor(_) => vec![patient.user_id],
        Party::Admin => vec![patient.user_id, doctor.user_id],
    };
    for user_id in &recipients {
        activity::notify(
            storage,
            user_id,
            NotificationKind::AppointmentCancelled,
            "Appointment cancelled",
            body.clone(),
            now,
        )
        .await;
    }
    activity::audit(
        storage,
        Some(actor),
        "appointment.cancelled",
        "appointment",
        &cancelled.id,
        json!({
            "reason": reason,
            "previous_status": appointment.status,
            "refunded_payment": refunded.map(|p| p.id),
        }),
        now,
    )
    .await;

    info!("Appointment {} cancelled by {} ({})", cancelled.id, actor.user_id, actor.role);
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{at, Fixture};
    use crate::storage_engine::CareStore;
    use models::PaymentStatus;

    fn two_hours() -> Duration {
        Duration::minutes(120)
    }

    fn because(reason: &str) -> CancelRequest {
        CancelRequest { reason: Some(reason.to_string()) }
    }

    #[tokio::test]
    async fn cancelling_thirty_minutes_ahead_is_rejected() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;

        let err = cancel_appointment(
            &fixture.storage,
            &fixture.patient_actor,
            &booking.appointment.id,
            because("Running late"),
            two_hours(),
            at("2025-06-01T09:30:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Validation(_)));
        assert!(err.to_string().contains("2 hours"));
    }

    #[tokio::test]
    async fn cancelling_exactly_at_the_notice_limit_is_allowed() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;

        let cancelled = cancel_appointment(
            &fixture.storage,
            &fixture.patient_actor,
            &booking.appointment.id,
            because("Clinic closed"),
            two_hours(),
            at("2025-06-01T08:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let late = fixture.book("2025-06-01T12:00:00Z", at("2025-05-30T08:00:00Z")).await;
        let err = cancel_appointment(
            &fixture.storage,
            &fixture.patient_actor,
            &late.appointment.id,
            because("Clinic closed"),
            two_hours(),
            at("2025-06-01T10:00:01Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Validation(_)));
    }

    #[tokio::test]
    async fn cancelling_three_hours_ahead_records_reason_and_actor() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        let now = at("2025-06-01T07:00:00Z");

        let cancelled = cancel_appointment(
            &fixture.storage,
            &fixture.patient_actor,
            &booking.appointment.id,
            because("Feeling better"),
            two_hours(),
            now,
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        let cancellation = cancelled.cancellation.unwrap();
        assert_eq!(cancellation.reason, "Feeling better");
        assert_eq!(cancellation.cancelled_by, fixture.patient_actor.user_id);
        assert_eq!(cancellation.cancelled_at, now);
    }

    #[tokio::test]
    async fn cancelled_slot_can_be_booked_again() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        cancel_appointment(
            &fixture.storage,
            &fixture.patient_actor,
            &booking.appointment.id,
            CancelRequest::default(),
            two_hours(),
            at("2025-05-31T08:00:00Z"),
        )
        .await
        .unwrap();

        let again = fixture.book("2025-06-01T10:00:00Z", at("2025-05-31T09:00:00Z")).await;
        assert_eq!(again.appointment.status, AppointmentStatus::PendingPayment);
    }

    #[tokio::test]
    async fn paid_appointment_is_refunded() {
        let fixture = Fixture::new().await;
        let confirmed = fixture.confirmed("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        cancel_appointment(
            &fixture.storage,
            &fixture.doctor_actor,
            &confirmed.id,
            because("Doctor unavailable"),
            two_hours(),
            at("2025-05-31T08:00:00Z"),
        )
        .await
        .unwrap();

        let payment = fixture
            .storage
            .get_payment(confirmed.payment_id.as_ref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn strangers_and_terminal_appointments_are_refused() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        let now = at("2025-05-31T08:00:00Z");

        let err = cancel_appointment(
            &fixture.storage,
            &fixture.other_patient_actor,
            &booking.appointment.id,
            CancelRequest::default(),
            two_hours(),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));

        cancel_appointment(
            &fixture.storage,
            &fixture.admin_actor,
            &booking.appointment.id,
            CancelRequest::default(),
            two_hours(),
            now,
        )
        .await
        .unwrap();
        let err = cancel_appointment(
            &fixture.storage,
            &fixture.admin_actor,
            &booking.appointment.id,
            CancelRequest::default(),
            two_hours(),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Conflict(_)));
    }

    #[test]
    fn notice_is_described_in_words() {
        assert_eq!(describe_notice(Duration::minutes(120)), "2 hours");
        assert_eq!(describe_notice(Duration::minutes(60)), "1 hour");
        assert_eq!(describe_notice(Duration::minutes(45)), "45 minutes");
        assert_eq!(describe_notice(Duration::minutes(90)), "90 minutes");
    }
}
