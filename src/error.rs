//! Error taxonomy shared by every gateway handler.
//!
//! Handlers return `Result<_, GatewayError>`; the dispatcher turns any
//! error into an `{"error": message}` payload so nothing ever escapes
//! across the IPC boundary as a protocol failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The resolved path escapes the sandbox root.
    #[error("Access denied")]
    AccessDenied,

    /// Missing ticket, file, or record.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A child process could not be spawned or exited abnormally.
    #[error("Process failure: {0}")]
    ProcessFailure(String),

    /// An HTTP upstream (AI API, fetched URL) failed or answered non-2xx.
    #[error("{0}")]
    UpstreamFailure(String),

    /// Malformed request arguments or unknown channel.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Short machine-readable kind, logged alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::AccessDenied => "access_denied",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::ProcessFailure(_) => "process_failure",
            GatewayError::UpstreamFailure(_) => "upstream_failure",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::UpstreamFailure(e.to_string())
    }
}

/// Malformed JSON arguments
impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::InvalidRequest(e.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
