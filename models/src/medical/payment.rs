// models/src/medical/payment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;
use crate::lifecycle::Lifecycle;

text_enum! {
    pub enum PaymentStatus as "payment status" {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

impl Lifecycle for PaymentStatus {
    fn can_transition_to(&self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }

    fn entity() -> &'static str {
        "payment"
    }
}

text_enum! {
    /// What a payment settles; `reference_id` points at the matching row.
    pub enum PaymentPurpose as "payment purpose" {
        Appointment => "appointment",
        Order => "order",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub purpose: PaymentPurpose,
    pub reference_id: EntityId,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(
        patient_id: EntityId,
        purpose: PaymentPurpose,
        reference_id: EntityId,
        amount_cents: i64,
        currency: String,
        now: DateTime<Utc>,
    ) -> Self {
        Payment {
            id: EntityId::generate(),
            patient_id,
            purpose,
            reference_id,
            amount_cents,
            currency,
            status: PaymentStatus::Pending,
            provider_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refunds_only_after_completion() {
        assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Completed));
    }
}
