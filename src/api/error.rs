use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::payments::MpesaError;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";
pub const STK_PUSH_FAILED_MESSAGE: &str = "Error initiating STK Push";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced to callers of the relay
///
/// Upstream failures are logged with their specific kind and then collapsed
/// into one generic body, so provider internals never reach the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required fields")]
    Validation,

    #[error(transparent)]
    Upstream(#[from] MpesaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation => {
                warn!("Rejected STK push request: {}", MISSING_FIELDS_MESSAGE);
                (StatusCode::BAD_REQUEST, MISSING_FIELDS_MESSAGE)
            }
            ApiError::Upstream(err) => {
                let stage = if err.is_token_error() {
                    "authenticate"
                } else {
                    "forward"
                };
                error!(
                    error_code = err.code(),
                    stage, "Error initiating STK Push: {}", err
                );
                (StatusCode::INTERNAL_SERVER_ERROR, STK_PUSH_FAILED_MESSAGE)
            }
        };

        let body = ErrorResponse {
            error: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
