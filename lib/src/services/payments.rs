// lib/src/services/payments.rs

//! Redirect-based checkout and the gateway's status callbacks.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use models::errors::{PrectaError, PrectaResult};
use models::{EntityId, Payment, PaymentPurpose, PaymentStatus};

use super::{activity, lifecycle, orders};
use crate::config::AppConfig;
use crate::storage_engine::PrectaStorage;

/// Builds the gateway redirect for a freshly created payment.
#[derive(Debug, Clone)]
pub struct Checkout {
    gateway_url: String,
    return_url: String,
    currency: String,
}

impl Checkout {
    pub fn new(gateway_url: &str, return_url: &str, currency: &str) -> Self {
        Checkout {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            return_url: return_url.trim_end_matches('/').to_string(),
            currency: currency.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Checkout::new(
            &config.payments.gateway_url,
            &config.server.public_url,
            &config.payments.default_currency,
        )
    }

    pub fn url_for(&self, payment: &Payment) -> String {
        format!("{}/checkout/{}?return_to={}", self.gateway_url, payment.id, self.return_url)
    }

    /// Currency for amounts that carry none of their own.
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

/// Body of a gateway callback.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: EntityId,
    pub status: PaymentStatus,
    #[serde(default)]
    pub provider_reference: Option<String>,
}

/// Applies a gateway callback. Redelivered events are accepted without effect.
pub async fn handle_payment_event(
    storage: &dyn PrectaStorage,
    event: PaymentEvent,
    now: DateTime<Utc>,
) -> PrectaResult<Payment> {
    let payment = storage
        .get_payment(&event.payment_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Payment not found"))?;

    if payment.status == event.status {
        debug!("Payment {} already {}; ignoring redelivery", payment.id, payment.status);
        return Ok(payment);
    }
    if !matches!(event.status, PaymentStatus::Completed | PaymentStatus::Failed) {
        return Err(PrectaError::invalid(format!(
            "Unsupported payment status '{}'",
            event.status
        )));
    }

    let payment = storage
        .update_payment_status(&payment.id, payment.status, event.status, event.provider_reference, now)
        .await?;
    activity::audit(
        storage,
        None,
        &format!("payment.{}", payment.status),
        "payment",
        &payment.id,
        json!({ "purpose": payment.purpose, "reference_id": payment.reference_id }),
        now,
    )
    .await;

    match (payment.status, payment.purpose) {
        (PaymentStatus::Completed, PaymentPurpose::Appointment) => {
            lifecycle::confirm_after_payment(storage, &payment, now).await?
        }
        (PaymentStatus::Completed, PaymentPurpose::Order) => {
            orders::confirm_after_payment(storage, &payment, now).await?
        }
        (PaymentStatus::Failed, PaymentPurpose::Appointment) => {
            lifecycle::release_after_failed_payment(storage, &payment, now).await?
        }
        (PaymentStatus::Failed, PaymentPurpose::Order) => {
            orders::cancel_after_failed_payment(storage, &payment, now).await?
        }
        (status, purpose) => info!(
            "Payment {} {}; {} {} unchanged",
            payment.id, status, purpose, payment.reference_id
        ),
    }
    Ok(payment)
}

/// Refunds the payment if it was collected. Pending payments are left to the gateway.
pub(crate) async fn refund_if_collected(
    storage: &dyn PrectaStorage,
    payment_id: Option<&EntityId>,
    now: DateTime<Utc>,
) -> PrectaResult<Option<Payment>> {
    let Some(payment_id) = payment_id else {
        return Ok(None);
    };
    let Some(payment) = storage.get_payment(payment_id).await? else {
        warn!("Payment {} referenced but missing", payment_id);
        return Ok(None);
    };
    if payment.status != PaymentStatus::Completed {
        return Ok(None);
    }
    let refunded = storage
        .update_payment_status(&payment.id, PaymentStatus::Completed, PaymentStatus::Refunded, None, now)
        .await?;
    info!("Refunded payment {} ({} {})", refunded.id, refunded.amount_cents, refunded.currency);
    Ok(Some(refunded))
}
