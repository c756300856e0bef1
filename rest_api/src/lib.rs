// rest_api/src/lib.rs

//! HTTP surface of the Precta backend: the JSON API under `/api` and the
//! pass-through to the auth provider.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod state;

use std::future::Future;

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{any, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{
    admin, appointments, auth_proxy, consultations, notifications, orders, payments, profiles,
    records, system,
};

pub use error::{ApiResult, RestApiError};
pub use state::AppState;

/// All routes, without the CORS and trace layers.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(system::health))
        .route("/version", get(system::version))
        // appointments
        .route("/appointments", post(appointments::book))
        .route("/appointments/my", get(appointments::mine))
        .route("/appointments/slots/:doctor_id", get(appointments::slots))
        .route("/appointments/:id", get(appointments::get).delete(appointments::cancel))
        .route("/appointments/:id/start", post(appointments::start))
        .route("/appointments/:id/complete", post(appointments::complete))
        .route("/appointments/:id/no-show", post(appointments::no_show))
        // consultations and prescriptions
        .route(
            "/consultations/:appointment_id",
            get(consultations::get).patch(consultations::update_notes),
        )
        .route("/consultations/:appointment_id/prescriptions", post(consultations::prescribe))
        .route("/prescriptions/my", get(consultations::my_prescriptions))
        // pharmacy orders
        .route("/orders", post(orders::place))
        .route("/orders/my", get(orders::mine))
        .route("/orders/:id", axum::routing::delete(orders::cancel))
        .route("/orders/:id/status", post(orders::advance))
        .route("/payments/webhook", post(payments::webhook))
        // medical records
        .route("/records", post(records::create))
        .route("/records/my", get(records::mine))
        .route("/records/:id", get(records::get).delete(records::delete))
        .route("/records/:id/share", post(records::share))
        .route("/records/:id/revoke", post(records::revoke))
        // profiles
        .route("/profiles/patient", post(profiles::create_patient))
        .route("/profiles/doctor", post(profiles::submit_doctor))
        .route("/doctors/me/availability", put(profiles::set_my_availability))
        .route("/doctors/:id", get(profiles::doctor))
        .route("/doctors/:id/availability", get(profiles::availability))
        .route("/notifications/my", get(notifications::mine))
        .route("/notifications/:id/read", post(notifications::mark_read))
        // admin
        .route("/admin/analytics/metrics", get(admin::metrics))
        .route("/admin/analytics/growth", get(admin::growth))
        .route("/admin/analytics/activity", get(admin::activity))
        .route("/admin/analytics/timeseries", get(admin::timeseries))
        .route("/admin/analytics/doctors/top", get(admin::top_doctors))
        .route("/admin/verifications", get(admin::pending_verifications))
        .route("/admin/verifications/:doctor_id", get(admin::verification_detail))
        .route("/admin/verifications/:doctor_id/approve", post(admin::approve))
        .route("/admin/verifications/:doctor_id/reject", post(admin::reject))
        .route("/auth/*path", any(auth_proxy::forward));

    Router::new().nest("/api", api).with_state(state)
}

fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE];
    Ok(match allowed_origin {
        // Session cookies need credentials, which rule out a wildcard origin.
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid allowed origin '{}'", origin))?,
            )
            .allow_methods(methods)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(Any),
    })
}

/// Serves the API until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let cors = cors_layer(state.config.server.allowed_origin.as_deref())?;

    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to address: {}:{}", host, port))?;
    info!("REST API listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped");
    Ok(())
}
