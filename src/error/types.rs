//! Error types for the validation client.

use thiserror::Error;

/// Main error type for the client.
///
/// Only `Config` and `Input` ever escape [`crate::validator::Validator::check`];
/// transport failures are absorbed by the dispatcher.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Caller input rejected before any network activity.
    #[error("Input error: {kind}")]
    Input { kind: InputErrorKind },

    /// Per-host transport failures.
    #[error("Transport error: {kind}")]
    Transport { kind: TransportErrorKind },

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation error kinds.
#[derive(Error, Debug)]
pub enum InputErrorKind {
    #[error("Invalid OTP length: {length} characters (expected 32 to 48)")]
    InvalidOtpLength { length: usize },

    #[error("Client ID is not configured")]
    MissingClientId,

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Transport error kinds.
#[derive(Error, Debug)]
pub enum TransportErrorKind {
    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },
}

impl ValidateError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for a transport request failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Request {
                message: message.into(),
            },
        }
    }
}

/// Result type alias for client operations.
pub type ValidateResult<T> = Result<T, ValidateError>;
