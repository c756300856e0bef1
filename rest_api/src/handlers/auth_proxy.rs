// rest_api/src/handlers/auth_proxy.rs

//! Pass-through to the external auth provider. Sign-in, sign-up and session
//! cookies are entirely the provider's; this only relays.

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, State},
    http::{header, HeaderMap, HeaderName, Method},
    response::Response,
};
use tracing::{debug, warn};

use crate::error::{ApiResult, RestApiError};
use crate::state::AppState;

const UNAVAILABLE: &str = "Authentication service is unavailable";

fn is_hop_header(name: &HeaderName) -> bool {
    name == header::HOST
        || name == header::CONNECTION
        || name == header::CONTENT_LENGTH
        || name == header::TRANSFER_ENCODING
}

pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());
    let target = format!("{}{}", state.config.auth.provider_url.trim_end_matches('/'), path);
    debug!("Proxying {} {} to the auth provider", method, path);

    let mut request = state.http.request(method, &target).body(body);
    for (name, value) in headers.iter().filter(|(name, _)| !is_hop_header(name)) {
        request = request.header(name, value);
    }

    let upstream = request.send().await.map_err(|e| {
        warn!("Auth provider at {} is unreachable: {}", target, e);
        RestApiError::BadGateway(UNAVAILABLE.to_string())
    })?;

    let mut response = Response::builder().status(upstream.status());
    for (name, value) in upstream.headers().iter().filter(|(name, _)| !is_hop_header(name)) {
        response = response.header(name, value);
    }
    let bytes = upstream.bytes().await.map_err(|e| {
        warn!("Auth provider response from {} was cut off: {}", target, e);
        RestApiError::BadGateway(UNAVAILABLE.to_string())
    })?;

    response
        .body(Body::from(bytes))
        .map_err(|e| RestApiError::BadGateway(format!("{}: {}", UNAVAILABLE, e)))
}
