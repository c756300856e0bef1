// rest_api/src/error.rs

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use models::errors::PrectaError;
use security::AuthError;

#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Domain(#[from] PrectaError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Unavailable(String),
}

impl RestApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestApiError::Domain(e) => match e {
                PrectaError::Validation(_) => StatusCode::BAD_REQUEST,
                PrectaError::NotFound(_) => StatusCode::NOT_FOUND,
                PrectaError::Unauthenticated => StatusCode::UNAUTHORIZED,
                PrectaError::Forbidden(_) => StatusCode::FORBIDDEN,
                PrectaError::Conflict(_) => StatusCode::CONFLICT,
                PrectaError::StorageError(_)
                | PrectaError::ConfigurationError(_)
                | PrectaError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RestApiError::Auth(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RestApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            RestApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RestApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            RestApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// The message shown to the client. Server-side failures are logged and
    /// replaced with a generic message.
    fn public_message(&self) -> String {
        match self {
            RestApiError::Auth(AuthError::InvalidToken(_)) => "Invalid or expired session".to_string(),
            _ if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
        }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for RestApiError {
    fn from(rejection: QueryRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for RestApiError {
    fn from(rejection: PathRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, RestApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ValidationError;

    #[test]
    fn domain_errors_map_to_http_status() {
        let cases = [
            (PrectaError::invalid("bad"), StatusCode::BAD_REQUEST),
            (PrectaError::Validation(ValidationError::MissingField("title")), StatusCode::BAD_REQUEST),
            (PrectaError::not_found("Record not found"), StatusCode::NOT_FOUND),
            (PrectaError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (PrectaError::forbidden("no"), StatusCode::FORBIDDEN),
            (PrectaError::conflict("This time slot is already booked"), StatusCode::CONFLICT),
            (PrectaError::StorageError("pool timed out".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(RestApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = RestApiError::from(PrectaError::StorageError("password authentication failed".into()));
        assert_eq!(err.public_message(), "Internal server error");
        let err = RestApiError::from(PrectaError::conflict("This time slot is already booked"));
        assert_eq!(err.public_message(), "This time slot is already booked");
    }
}
