// models/src/medical/appointment.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;
use crate::lifecycle::Lifecycle;

text_enum! {
    pub enum ConsultationType as "consultation type" {
        InPerson => "in_person",
        Video => "video",
    }
}

text_enum! {
    pub enum AppointmentStatus as "appointment status" {
        PendingPayment => "pending_payment",
        Confirmed => "confirmed",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

impl AppointmentStatus {
    /// Statuses that hold the (doctor, scheduled_at) pair; the database
    /// uniqueness constraint is partial over exactly these.
    pub const SLOT_OCCUPYING: &'static [AppointmentStatus] = &[
        AppointmentStatus::PendingPayment,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
    ];

    pub fn occupies_slot(&self) -> bool {
        Self::SLOT_OCCUPYING.contains(self)
    }
}

impl Lifecycle for AppointmentStatus {
    fn can_transition_to(&self, next: Self) -> bool {
        use AppointmentStatus::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Cancelled | NoShow => true,
            Confirmed => *self == PendingPayment,
            InProgress => *self == Confirmed,
            Completed => *self == InProgress,
            PendingPayment => false,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    fn entity() -> &'static str {
        "appointment"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_by: EntityId,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub clinic_id: Option<EntityId>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub consultation_type: ConsultationType,
    pub status: AppointmentStatus,
    pub cancellation: Option<Cancellation>,
    pub notes: Option<String>,
    pub payment_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(self.duration_minutes as i64)
    }

    /// Whether `[start, end)` intersects this appointment widened by `buffer` on both sides.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>, buffer: Duration) -> bool {
        start < self.ends_at() + buffer && self.scheduled_at - buffer < end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub clinic_id: Option<EntityId>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub consultation_type: ConsultationType,
    pub notes: Option<String>,
    pub payment_id: Option<EntityId>,
}

impl Appointment {
    /// Every appointment starts life waiting for payment.
    pub fn from_new(new_appointment: NewAppointment, now: DateTime<Utc>) -> Self {
        Appointment {
            id: EntityId::generate(),
            patient_id: new_appointment.patient_id,
            doctor_id: new_appointment.doctor_id,
            clinic_id: new_appointment.clinic_id,
            scheduled_at: new_appointment.scheduled_at,
            duration_minutes: new_appointment.duration_minutes,
            consultation_type: new_appointment.consultation_type,
            status: AppointmentStatus::PendingPayment,
            cancellation: None,
            notes: new_appointment.notes,
            payment_id: new_appointment.payment_id,
            created_at: now,
            updated_at: now,
        }
    }
}
