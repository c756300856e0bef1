// models/src/medical/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;
use crate::lifecycle::Lifecycle;

text_enum! {
    pub enum OrderStatus as "order status" {
        PendingPayment => "pending_payment",
        Placed => "placed",
        Processing => "processing",
        Dispatched => "dispatched",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl Lifecycle for OrderStatus {
    fn can_transition_to(&self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Placed)
                | (Placed, Processing)
                | (Processing, Dispatched)
                | (Dispatched, Delivered)
                | (PendingPayment, Cancelled)
                | (Placed, Cancelled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    fn entity() -> &'static str {
        "order"
    }
}

/// A medication order placed against one prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub prescription_id: EntityId,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub currency: String,
    pub delivery_address: String,
    pub payment_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn fulfilment_moves_forward_only() {
        assert!(PendingPayment.can_transition_to(Placed));
        assert!(Placed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Dispatched));
        assert!(Dispatched.can_transition_to(Delivered));
        assert!(!Dispatched.can_transition_to(Processing));
        assert!(!Placed.can_transition_to(Delivered));
    }

    #[test]
    fn cancellation_stops_once_processing() {
        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(Placed.can_transition_to(Cancelled));
        assert!(!Processing.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }
}
