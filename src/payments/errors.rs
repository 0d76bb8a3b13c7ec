use thiserror::Error;

pub type MpesaResult<T> = Result<T, MpesaError>;

/// Failures talking to the M-Pesa Daraja API.
///
/// The HTTP layer collapses every variant into the same 500 response; the
/// variant and its payload only ever reach the logs.
#[derive(Debug, Error)]
pub enum MpesaError {
    #[error("OAuth token request failed with status {status}: {body}")]
    TokenFetch { status: u16, body: String },

    #[error("OAuth token response was malformed: {message}")]
    InvalidTokenResponse { message: String },

    #[error("STK push rejected with status {status}: {body}")]
    PushRejected { status: u16, body: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl MpesaError {
    pub fn token_fetch(status: u16, body: impl Into<String>) -> Self {
        Self::TokenFetch {
            status,
            body: body.into(),
        }
    }

    pub fn invalid_token_response(message: impl Into<String>) -> Self {
        Self::InvalidTokenResponse {
            message: message.into(),
        }
    }

    pub fn push_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::PushRejected {
            status,
            body: body.into(),
        }
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Stable identifier for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenFetch { .. } => "token_fetch_failed",
            Self::InvalidTokenResponse { .. } => "token_response_invalid",
            Self::PushRejected { .. } => "stk_push_rejected",
            Self::NetworkError { .. } => "network_error",
            Self::SerializationError { .. } => "serialization_error",
            Self::ConfigError { .. } => "config_error",
        }
    }

    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenFetch { .. } | Self::InvalidTokenResponse { .. }
        )
    }
}

impl From<reqwest::Error> for MpesaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_error(format!("request timed out: {}", err))
        } else {
            Self::network_error(err.to_string())
        }
    }
}
