// rest_api/src/response.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
struct SuccessBody<T> {
    success: bool,
    data: T,
}

/// `{ "success": true, "data": ... }` with status 200.
pub struct Envelope<T>(pub T);

/// Same envelope with status 201.
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(SuccessBody { success: true, data: self.0 }).into_response()
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Envelope(self.0)).into_response()
    }
}
