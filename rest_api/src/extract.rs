// rest_api/src/extract.rs

//! Request extractors that fail with the JSON error envelope instead of
//! axum's plain-text rejections.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap, HeaderName,
    },
};
use serde::de::DeserializeOwned;

use lib::Actor;
use models::errors::PrectaError;
use security::{extract_token, AuthError};

use crate::error::{ApiResult, RestApiError};
use crate::state::AppState;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RestApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RestApiError))]
pub struct ApiPath<T>(pub T);

/// Parses an optional JSON body; an empty body yields the default.
pub fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| RestApiError::InvalidInput(e.to_string()))
}

/// The caller identified by the session token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Actor);

fn header_str<'a>(headers: &'a HeaderMap, name: HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(
            header_str(&parts.headers, AUTHORIZATION),
            header_str(&parts.headers, COOKIE),
            &state.config.auth.session_cookie,
        )
        .ok_or(AuthError::MissingToken)?;

        let claims = state.keys.validate_token(&token)?;
        Ok(AuthUser(Actor::new(claims.user_id()?, claims.role)))
    }
}

impl AuthUser {
    /// Checks the role permission table.
    pub fn require(&self, state: &AppState, permission: &str) -> ApiResult<&Actor> {
        if state.roles.has_permission(self.0.role, permission) {
            Ok(&self.0)
        } else {
            Err(PrectaError::forbidden(format!(
                "The {} role may not perform this action",
                self.0.role
            ))
            .into())
        }
    }
}
