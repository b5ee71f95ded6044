//! Backend attempt errors

use std::time::Duration;

use thiserror::Error;

/// Why a single backend attempt produced no answer
///
/// None of these abort a save or load; they are recorded and the next
/// backend is tried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend needs a credential or identifier it does not have
    #[error("Missing credential: {0}")]
    CredentialMissing(String),

    /// Network failure or timeout
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// The service answered with a non-success status
    #[error("Rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Stored or returned data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Error for an attempt that ran past its time limit
    pub fn timed_out(limit: Duration) -> Self {
        BackendError::Unreachable(format!("timed out after {}s", limit.as_secs_f32()))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return BackendError::Serialization(error.to_string());
        }
        if let Some(status) = error.status() {
            return BackendError::Rejected {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        BackendError::Unreachable(error.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        BackendError::Serialization(error.to_string())
    }
}

impl From<base64::DecodeError> for BackendError {
    fn from(error: base64::DecodeError) -> Self {
        BackendError::Serialization(format!("invalid base64 content: {}", error))
    }
}

/// Result type for backend attempts
pub type BackendResult<T> = Result<T, BackendError>;
