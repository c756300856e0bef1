// lib/src/services/orders.rs

//! Medication orders placed against prescriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use models::errors::{PrectaError, PrectaResult, ValidationError};
use models::{
    EntityId, Lifecycle, NotificationKind, Order, OrderStatus, Payment, PaymentPurpose, UserRole,
};

use super::access::{self, Actor};
use super::payments::{self, Checkout};
use super::activity;
use crate::storage_engine::PrectaStorage;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub prescription_id: EntityId,
    /// Falls back to the address on the patient profile.
    #[serde(default)]
    pub delivery_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCheckout {
    pub order: Order,
    pub payment: Payment,
    pub checkout_url: String,
}

pub async fn place_order(
    storage: &dyn PrectaStorage,
    checkout: &Checkout,
    actor: &Actor,
    request: OrderRequest,
    now: DateTime<Utc>,
) -> PrectaResult<OrderCheckout> {
    let patient = access::patient_profile(storage, actor).await?;
    let prescription = storage
        .get_prescription(&request.prescription_id)
        .await?
        .filter(|p| p.patient_id == patient.id)
        .ok_or_else(|| PrectaError::not_found("Prescription not found"))?;
    if !prescription.is_valid_at(now) {
        return Err(PrectaError::invalid("This prescription has expired"));
    }
    let delivery_address = request
        .delivery_address
        .or_else(|| patient.address.clone())
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or(ValidationError::MissingField("delivery_address"))?;

    let mut order = Order {
        id: EntityId::generate(),
        patient_id: patient.id.clone(),
        prescription_id: prescription.id.clone(),
        status: OrderStatus::PendingPayment,
        total_cents: prescription.total_cents()?,
        currency: checkout.currency().to_string(),
        delivery_address,
        payment_id: None,
        created_at: now,
        updated_at: now,
    };
    let payment = Payment::pending(
        patient.id.clone(),
        PaymentPurpose::Order,
        order.id.clone(),
        order.total_cents,
        order.currency.clone(),
        now,
    );
    order.payment_id = Some(payment.id.clone());

    let order = storage.insert_order(order).await?;
    let payment = storage.insert_payment(payment).await?;

    activity::audit(
        storage,
        Some(actor),
        "order.placed",
        "order",
        &order.id,
        json!({ "prescription_id": order.prescription_id, "total_cents": order.total_cents }),
        now,
    )
    .await;
    info!("Order {} created for prescription {}", order.id, order.prescription_id);
    let checkout_url = checkout.url_for(&payment);
    Ok(OrderCheckout {
        order,
        payment,
        checkout_url,
    })
}

pub async fn my_orders(storage: &dyn PrectaStorage, actor: &Actor) -> PrectaResult<Vec<Order>> {
    let patient = access::patient_profile(storage, actor).await?;
    storage.list_orders_for_patient(&patient.id).await
}

async fn load_order(storage: &dyn PrectaStorage, order_id: &EntityId) -> PrectaResult<Order> {
    storage
        .get_order(order_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Order not found"))
}

async fn notify_patient(storage: &dyn PrectaStorage, order: &Order, now: DateTime<Utc>) {
    match storage.get_patient(&order.patient_id).await {
        Ok(Some(patient)) => {
            activity::notify(
                storage,
                &patient.user_id,
                NotificationKind::OrderUpdated,
                "Order update",
                format!("Your medication order is now {}", order.status.as_str().replace('_', " ")),
                now,
            )
            .await
        }
        Ok(None) => warn!("Order {} belongs to a missing patient", order.id),
        Err(e) => warn!("Could not notify patient of order {}: {}", order.id, e),
    }
}

/// Moves a paid order to `placed`; a payment for a cancelled order is refunded.
pub async fn confirm_after_payment(
    storage: &dyn PrectaStorage,
    payment: &Payment,
    now: DateTime<Utc>,
) -> PrectaResult<()> {
    let order = load_order(storage, &payment.reference_id).await?;
    match order.status {
        OrderStatus::PendingPayment => {
            let placed = storage
                .update_order_status(&order.id, OrderStatus::PendingPayment, OrderStatus::Placed, now)
                .await?;
            notify_patient(storage, &placed, now).await;
            info!("Order {} paid and placed", placed.id);
        }
        OrderStatus::Cancelled => {
            warn!("Payment {} completed for cancelled order {}; refunding", payment.id, order.id);
            payments::refund_if_collected(storage, Some(&payment.id), now).await?;
        }
        status => info!("Order {} already {}", order.id, status),
    }
    Ok(())
}

/// Cancels an unpaid order whose payment failed.
pub async fn cancel_after_failed_payment(
    storage: &dyn PrectaStorage,
    payment: &Payment,
    now: DateTime<Utc>,
) -> PrectaResult<()> {
    let order = load_order(storage, &payment.reference_id).await?;
    if order.status != OrderStatus::PendingPayment || order.payment_id.as_ref() != Some(&payment.id) {
        info!("Order {} is {}; failed payment {} ignored", order.id, order.status, payment.id);
        return Ok(());
    }
    let cancelled = storage
        .update_order_status(&order.id, OrderStatus::PendingPayment, OrderStatus::Cancelled, now)
        .await?;
    notify_patient(storage, &cancelled, now).await;
    info!("Order {} cancelled after failed payment {}", cancelled.id, payment.id);
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

/// Fulfilment steps, taken by an admin on behalf of the pharmacy.
pub async fn advance_order(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    order_id: &EntityId,
    next: OrderStatus,
    now: DateTime<Utc>,
) -> PrectaResult<Order> {
    actor.require_admin()?;
    if !matches!(
        next,
        OrderStatus::Processing | OrderStatus::Dispatched | OrderStatus::Delivered
    ) {
        return Err(PrectaError::invalid(format!(
            "Orders cannot be moved to '{}' here",
            next
        )));
    }
    let order = load_order(storage, order_id).await?;
    let updated = storage
        .update_order_status(&order.id, order.status, next, now)
        .await?;
    notify_patient(storage, &updated, now).await;
    activity::audit(
        storage,
        Some(actor),
        &format!("order.{}", next),
        "order",
        &updated.id,
        json!({ "previous_status": order.status }),
        now,
    )
    .await;
    Ok(updated)
}

/// The ordering patient or an admin cancels before processing starts.
pub async fn cancel_order(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    order_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<Order> {
    let order = load_order(storage, order_id).await?;
    if actor.role != UserRole::Admin {
        let patient = access::patient_profile(storage, actor).await?;
        if patient.id != order.patient_id {
            return Err(PrectaError::forbidden("This order belongs to another patient"));
        }
    }
    order.status.ensure_transition(OrderStatus::Cancelled)?;

    let cancelled = storage
        .update_order_status(&order.id, order.status, OrderStatus::Cancelled, now)
        .await?;
    payments::refund_if_collected(storage, cancelled.payment_id.as_ref(), now).await?;
    notify_patient(storage, &cancelled, now).await;
    activity::audit(
        storage,
        Some(actor),
        "order.cancelled",
        "order",
        &cancelled.id,
        json!({ "previous_status": order.status }),
        now,
    )
    .await;
    info!("Order {} cancelled", cancelled.id);
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payments::{handle_payment_event, PaymentEvent};
    use crate::services::testing::{at, Fixture};
    use crate::storage_engine::CareStore;
    use models::PaymentStatus;

    async fn ordered(fixture: &Fixture) -> OrderCheckout {
        let prescription = fixture.prescription("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        place_order(
            &fixture.storage,
            &fixture.checkout,
            &fixture.patient_actor,
            OrderRequest { prescription_id: prescription.id, delivery_address: None },
            at("2025-06-01T11:00:00Z"),
        )
        .await
        .unwrap()
    }

    async fn pay(fixture: &Fixture, payment_id: &EntityId) {
        handle_payment_event(
            &fixture.storage,
            PaymentEvent {
                payment_id: payment_id.clone(),
                status: PaymentStatus::Completed,
                provider_reference: None,
            },
            at("2025-06-01T11:05:00Z"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn order_is_placed_once_paid_and_fulfilled_by_admin() {
        let fixture = Fixture::new().await;
        let checkout = ordered(&fixture).await;
        assert_eq!(checkout.order.status, OrderStatus::PendingPayment);
        assert_eq!(checkout.order.total_cents, 31_500);
        assert_eq!(checkout.order.delivery_address, "12 Moi Avenue, Nairobi");

        pay(&fixture, &checkout.payment.id).await;
        let order = fixture.storage.get_order(&checkout.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Placed);

        let err = advance_order(
            &fixture.storage,
            &fixture.patient_actor,
            &order.id,
            OrderStatus::Processing,
            at("2025-06-01T12:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Forbidden(_)));

        for next in [OrderStatus::Processing, OrderStatus::Dispatched, OrderStatus::Delivered] {
            advance_order(&fixture.storage, &fixture.admin_actor, &order.id, next, at("2025-06-01T12:00:00Z"))
                .await
                .unwrap();
        }
        let err = cancel_order(&fixture.storage, &fixture.patient_actor, &order.id, at("2025-06-02T12:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PrectaError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_payment_cancels_the_order() {
        let fixture = Fixture::new().await;
        let checkout = ordered(&fixture).await;
        handle_payment_event(
            &fixture.storage,
            PaymentEvent {
                payment_id: checkout.payment.id.clone(),
                status: PaymentStatus::Failed,
                provider_reference: None,
            },
            at("2025-06-01T11:05:00Z"),
        )
        .await
        .unwrap();
        let order = fixture.storage.get_order(&checkout.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_a_placed_order_refunds_it() {
        let fixture = Fixture::new().await;
        let checkout = ordered(&fixture).await;
        pay(&fixture, &checkout.payment.id).await;

        let cancelled = cancel_order(&fixture.storage, &fixture.patient_actor, &checkout.order.id, at("2025-06-01T12:00:00Z"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        let payment = fixture.storage.get_payment(&checkout.payment.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn foreign_or_expired_prescriptions_cannot_be_ordered() {
        let fixture = Fixture::new().await;
        let prescription = fixture.prescription("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;

        let err = place_order(
            &fixture.storage,
            &fixture.checkout,
            &fixture.other_patient_actor,
            OrderRequest { prescription_id: prescription.id.clone(), delivery_address: Some("Kisumu".to_string()) },
            at("2025-06-01T11:00:00Z"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Prescription not found");

        let err = place_order(
            &fixture.storage,
            &fixture.checkout,
            &fixture.patient_actor,
            OrderRequest { prescription_id: prescription.id, delivery_address: None },
            at("2025-08-01T11:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[tokio::test]
    async fn overflowing_prescription_total_is_a_validation_error() {
        let fixture = Fixture::new().await;
        let mut prescription = fixture.prescription("2025-06-01T10:00:00Z", at("2025-05-30T08:00:00Z")).await;
        let mut item = prescription.items[0].clone();
        item.quantity = 1;
        item.unit_price_cents = i64::MAX / 2 + 1;
        prescription.id = EntityId::generate();
        prescription.items = vec![item.clone(), item];
        let stored = fixture.storage.insert_prescription(prescription).await.unwrap();

        let err = place_order(
            &fixture.storage,
            &fixture.checkout,
            &fixture.patient_actor,
            OrderRequest { prescription_id: stored.id, delivery_address: None },
            at("2025-06-01T11:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrectaError::Validation(_)));
        assert!(my_orders(&fixture.storage, &fixture.patient_actor).await.unwrap().is_empty());
    }
}
