// models/src/medical/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;

text_enum! {
    pub enum NotificationKind as "notification kind" {
        AppointmentBooked => "appointment_booked",
        AppointmentConfirmed => "appointment_confirmed",
        AppointmentCancelled => "appointment_cancelled",
        VerificationDecided => "verification_decided",
        OrderUpdated => "order_updated",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: EntityId,
    pub user_id: EntityId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: EntityId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Notification {
            id: EntityId::generate(),
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            read_at: None,
            created_at: now,
        }
    }
}
