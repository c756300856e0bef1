// lib/src/services/lifecycle.rs

//! Appointment status changes after booking.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use models::errors::{PrectaError, PrectaResult};
use models::{
    Appointment, AppointmentStatus, Cancellation, Consultation, ConsultationNotes,
    ConsultationType, Doctor, EntityId, Lifecycle, NotificationKind, Patient, Payment,
};

use super::access::{self, Actor, Party};
use super::{activity, payments};
use crate::storage_engine::PrectaStorage;

/// Patient and doctor profiles behind an appointment.
pub(crate) async fn participants(
    storage: &dyn PrectaStorage,
    appointment: &Appointment,
) -> PrectaResult<(Patient, Doctor)> {
    let patient = storage
        .get_patient(&appointment.patient_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Patient not found"))?;
    let doctor = storage
        .get_doctor(&appointment.doctor_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Doctor not found"))?;
    Ok((patient, doctor))
}

/// Room name handed to the external video SDK.
pub fn video_room_for(appointment_id: &EntityId) -> String {
    format!("precta-{}", appointment_id)
}

/// Confirms the appointment a completed payment belongs to. Money that
/// arrives for an appointment that has meanwhile been cancelled is refunded.
pub async fn confirm_after_payment(
    storage: &dyn PrectaStorage,
    payment: &Payment,
    now: DateTime<Utc>,
) -> PrectaResult<()> {
    let appointment = access::load_appointment(storage, &payment.reference_id).await?;
    match appointment.status {
        AppointmentStatus::PendingPayment => {
            let confirmed = storage
                .update_appointment_status(
                    &appointment.id,
                    AppointmentStatus::PendingPayment,
                    AppointmentStatus::Confirmed,
                    None,
                    now,
                )
                .await?;
            let (patient, doctor) = participants(storage, &confirmed).await?;
            let when = confirmed.scheduled_at.format("%Y-%m-%d %H:%M UTC");
            activity::notify(
                storage,
                &patient.user_id,
                NotificationKind::AppointmentConfirmed,
                "Appointment confirmed",
                format!("Your appointment with {} on {} is confirmed", doctor.full_name, when),
                now,
            )
            .await;
            activity::notify(
                storage,
                &doctor.user_id,
                NotificationKind::AppointmentConfirmed,
                "Appointment confirmed",
                format!("{} paid for the appointment on {}", patient.full_name, when),
                now,
            )
            .await;
            activity::audit(
                storage,
                None,
                "appointment.confirmed",
                "appointment",
                &confirmed.id,
                json!({ "payment_id": payment.id }),
                now,
            )
            .await;
            info!("Appointment {} confirmed by payment {}", confirmed.id, payment.id);
        }
        status if status.is_terminal() => {
            warn!(
                "Payment {} completed for {} appointment {}; refunding",
                payment.id, status, appointment.id
            );
            payments::refund_if_collected(storage, Some(&payment.id), now).await?;
        }
        status => debug!("Appointment {} already {}", appointment.id, status),
    }
    Ok(())
}

/// Cancels an unpaid appointment whose payment failed, freeing its slot.
pub async fn release_after_failed_payment(
    storage: &dyn PrectaStorage,
    payment: &Payment,
    now: DateTime<Utc>,
) -> PrectaResult<()> {
    let appointment = access::load_appointment(storage, &payment.reference_id).await?;
    if appointment.status != AppointmentStatus::PendingPayment {
        debug!("Appointment {} already {}", appointment.id, appointment.status);
        return Ok(());
    }
    if appointment.payment_id.as_ref() != Some(&payment.id) {
        debug!("Payment {} is not the current payment of appointment {}", payment.id, appointment.id);
        return Ok(());
    }
    let (patient, doctor) = participants(storage, &appointment).await?;
    let released = storage
        .update_appointment_status(
            &appointment.id,
            AppointmentStatus::PendingPayment,
            AppointmentStatus::Cancelled,
            Some(Cancellation {
                reason: "Payment failed".to_string(),
                cancelled_by: patient.user_id.clone(),
                cancelled_at: now,
            }),
            now,
        )
        .await?;
    let when = released.scheduled_at.format("%Y-%m-%d %H:%M UTC");
    activity::notify(
        storage,
        &patient.user_id,
        NotificationKind::AppointmentCancelled,
        "Payment failed",
        format!(
            "Your appointment with {} on {} was released because the payment failed",
            doctor.full_name, when
        ),
        now,
    )
    .await;
    activity::audit(
        storage,
        None,
        "appointment.payment_failed",
        "appointment",
        &released.id,
        json!({ "payment_id": payment.id }),
        now,
    )
    .await;
    info!("Appointment {} released after failed payment {}", released.id, payment.id);
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedAppointment {
    pub appointment: Appointment,
    pub consultation: Consultation,
}

/// The assigned doctor opens a confirmed appointment; this creates its consultation.
pub async fn start_appointment(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<StartedAppointment> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    let doctor = access::assigned_doctor(storage, actor, &appointment).await?;

    let appointment = storage
        .update_appointment_status(
            &appointment.id,
            appointment.status,
            AppointmentStatus::InProgress,
            None,
            now,
        )
        .await?;

    let video_room = (appointment.consultation_type == ConsultationType::Video)
        .then(|| video_room_for(&appointment.id));
    let consultation = storage
        .insert_consultation(Consultation {
            id: EntityId::generate(),
            appointment_id: appointment.id.clone(),
            doctor_id: doctor.id.clone(),
            patient_id: appointment.patient_id.clone(),
            started_at: now,
            ended_at: None,
            notes: None,
            diagnosis: None,
            video_room,
            created_at: now,
            updated_at: now,
        })
        .await?;

    activity::audit(
        storage,
        Some(actor),
        "appointment.started",
        "appointment",
        &appointment.id,
        json!({ "consultation_id": consultation.id }),
        now,
    )
    .await;
    info!("Appointment {} in progress", appointment.id);
    Ok(StartedAppointment {
        appointment,
        consultation,
    })
}

pub async fn complete_appointment(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<Appointment> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    access::assigned_doctor(storage, actor, &appointment).await?;

    let completed = storage
        .update_appointment_status(
            &appointment.id,
            appointment.status,
            AppointmentStatus::Completed,
            None,
            now,
        )
        .await?;
    if let Some(consultation) = storage.get_consultation_by_appointment(&completed.id).await? {
        storage
            .update_consultation(&consultation.id, ConsultationNotes::default(), Some(now), now)
            .await?;
    }

    activity::audit(
        storage,
        Some(actor),
        "appointment.completed",
        "appointment",
        &completed.id,
        json!({}),
        now,
    )
    .await;
    info!("Appointment {} completed", completed.id);
    Ok(completed)
}

/// The assigned doctor or an admin records that the patient never came.
pub async fn mark_no_show(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<Appointment> {
    let appointment = access::load_appointment(storage, appointment_id).await?;
    if let Party::Patient(_) = access::appointment_party(storage, actor, &appointment).await? {
        return Err(PrectaError::forbidden(
            "Only the doctor or an administrator can mark a no-show",
        ));
    }
    if now < appointment.scheduled_at {
        return Err(PrectaError::invalid(
            "An appointment can only be marked as a no-show after its scheduled time",
        ));
    }

    let updated = storage
        .update_appointment_status(
            &appointment.id,
            appointment.status,
            AppointmentStatus::NoShow,
            None,
            now,
        )
        .await?;
    activity::audit(
        storage,
        Some(actor),
        "appointment.no_show",
        "appointment",
        &updated.id,
        json!({ "previous_status": appointment.status }),
        now,
    )
    .await;
    info!("Appointment {} marked as no-show", updated.id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payments::{handle_payment_event, PaymentEvent};
    use crate::services::testing::{at, Fixture};
    use crate::storage_engine::CareStore;
    use models::PaymentStatus;

    #[tokio::test]
    async fn failed_payment_releases_the_slot() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");

        let failed = fixture.book("2025-06-01T10:00:00Z", now).await;
        handle_payment_event(
            &fixture.storage,
            PaymentEvent {
                payment_id: failed.payment.id.clone(),
                status: PaymentStatus::Failed,
                provider_reference: None,
            },
            now,
        )
        .await
        .unwrap();
        let released = access::load_appointment(&fixture.storage, &failed.appointment.id).await.unwrap();
        assert_eq!(released.status, AppointmentStatus::Cancelled);
        let cancellation = released.cancellation.unwrap();
        assert_eq!(cancellation.reason, "Payment failed");
        assert_eq!(cancellation.cancelled_by, fixture.patient.user_id);

        let rebooked = crate::services::booking::book_appointment(
            &fixture.storage,
            &fixture.checkout,
            &fixture.other_patient_actor,
            crate::services::booking::BookingRequest {
                doctor_id: fixture.doctor.id.clone(),
                scheduled_at: at("2025-06-01T10:00:00Z"),
                consultation_type: ConsultationType::Video,
                duration_minutes: None,
                notes: None,
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(rebooked.appointment.status, AppointmentStatus::PendingPayment);
        assert_eq!(rebooked.appointment.patient_id, fixture.other_patient.id);
    }

    #[tokio::test]
    async fn late_failure_does_not_undo_a_confirmation() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let confirmed = fixture.confirmed("2025-06-01T11:00:00Z", now).await;
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let payment_id = confirmed.payment_id.clone().unwrap();
        let payment = fixture.storage.get_payment(&payment_id).await.unwrap().unwrap();
        release_after_failed_payment(&fixture.storage, &payment, now).await.unwrap();
        let still = access::load_appointment(&fixture.storage, &confirmed.id).await.unwrap();
        assert_eq!(still.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn redelivered_payment_event_is_harmless() {
        let fixture = Fixture::new().await;
        let now = at("2025-05-30T08:00:00Z");
        let booking = fixture.book("2025-06-01T10:00:00Z", now).await;
        let event = PaymentEvent {
            payment_id: booking.payment.id.clone(),
            status: PaymentStatus::Completed,
            provider_reference: Some("MPESA-1".to_string()),
        };
        handle_payment_event(&fixture.storage, event.clone(), now).await.unwrap();
        let payment = handle_payment_event(&fixture.storage, event, now).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.provider_reference.as_deref(), Some("MPESA-1"));
    }

    #[tokio::test]
    async fn full_visit_runs_through_consultation() {
        let fixture = Fixture::new().await;
        let appointment = fixture.confirmed("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;

        let started = start_appointment(
            &fixture.storage,
            &fixture.doctor_actor,
            &appointment.id,
            at("2025-06-01T10:01:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(started.appointment.status, AppointmentStatus::InProgress);
        assert_eq!(
            started.consultation.video_room.as_deref(),
            Some(format!("precta-{}", appointment.id).as_str())
        );

        let err = start_appointment(
            &fixture.storage,
            &fixture.doctor_actor,
            &appointment.id,
            at("2025-06-01T10:02:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Conflict(_)));

        let completed = complete_appointment(
            &fixture.storage,
            &fixture.doctor_actor,
            &appointment.id,
            at("2025-06-01T10:30:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
        let consultation = fixture
            .storage
            .get_consultation_by_appointment(&appointment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(consultation.ended_at, Some(at("2025-06-01T10:30:00Z")));
    }

    #[tokio::test]
    async fn only_the_assigned_doctor_starts() {
        let fixture = Fixture::new().await;
        let appointment = fixture.confirmed("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        for actor in [&fixture.patient_actor, &fixture.in_person_doctor_actor, &fixture.admin_actor] {
            let err = start_appointment(&fixture.storage, actor, &appointment.id, at("2025-06-01T10:00:00Z"))
                .await
                .unwrap_err();
            assert!(matches!(err, PrectaError::Forbidden(_)), "{:?}", actor.role);
        }
    }

    #[tokio::test]
    async fn unpaid_appointment_cannot_start() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        let err = start_appointment(
            &fixture.storage,
            &fixture.doctor_actor,
            &booking.appointment.id,
            at("2025-06-01T10:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("pending_payment"));
    }

    #[tokio::test]
    async fn no_show_only_after_start_time() {
        let fixture = Fixture::new().await;
        let appointment = fixture.confirmed("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;

        let err = mark_no_show(&fixture.storage, &fixture.doctor_actor, &appointment.id, at("2025-06-01T09:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Validation(_)));

        let err = mark_no_show(&fixture.storage, &fixture.patient_actor, &appointment.id, at("2025-06-01T10:20:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));

        let updated = mark_no_show(&fixture.storage, &fixture.admin_actor, &appointment.id, at("2025-06-01T10:20:00Z"))
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::NoShow);
    }

    #[tokio::test]
    async fn late_payment_for_cancelled_appointment_is_refunded() {
        let fixture = Fixture::new().await;
        let booking = fixture.book("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        crate::services::cancellation::cancel_appointment(
            &fixture.storage,
            &fixture.patient_actor,
            &booking.appointment.id,
            Default::default(),
            chrono::Duration::minutes(120),
            at("2025-05-30T09:00:00Z"),
        )
        .await
        .unwrap();

        handle_payment_event(
            &fixture.storage,
            PaymentEvent {
                payment_id: booking.payment.id.clone(),
                status: PaymentStatus::Completed,
                provider_reference: None,
            },
            at("2025-05-30T09:05:00Z"),
        )
        .await
        .unwrap();
        let payment = fixture.storage.get_payment(&booking.payment.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }
}
