// rest_api/src/handlers/system.rs

use axum::extract::State;
use serde_json::{json, Value};
use tracing::error;

use lib::StorageEngine;

use crate::error::{ApiResult, RestApiError};
use crate::response::Envelope;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> ApiResult<Envelope<Value>> {
    let engine = state.storage.engine_type();
    if let Err(e) = state.storage.health_check().await {
        error!("Health check failed for {} storage: {}", engine, e);
        return Err(RestApiError::Unavailable("Storage is unavailable".to_string()));
    }
    Ok(Envelope(json!({ "status": "ok", "storage": engine.to_string() })))
}

pub async fn version() -> Envelope<Value> {
    Envelope(json!({
        "name": "precta",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
