// rest_api/src/handlers/payments.rs

use axum::{extract::State, http::HeaderMap};
use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::warn;

use lib::services::payments::{self, PaymentEvent};
use models::errors::PrectaError;
use models::Payment;

use crate::error::{ApiResult, RestApiError};
use crate::extract::ApiJson;
use crate::response::Envelope;
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Status callback from the payment gateway.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(event): ApiJson<PaymentEvent>,
) -> ApiResult<Envelope<Payment>> {
    let expected = state.config.payments.webhook_secret.as_str();
    if expected.is_empty() {
        return Err(RestApiError::Unavailable("Payment webhook is not configured".to_string()));
    }
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !bool::from(presented.ct_eq(expected.as_bytes())) {
        warn!("Rejected payment webhook for {} with a bad secret", event.payment_id);
        return Err(PrectaError::forbidden("Invalid webhook secret").into());
    }

    let payment = payments::handle_payment_event(state.storage(), event, Utc::now()).await?;
    Ok(Envelope(payment))
}
