//! Error types for the SMS relay stage.

use std::time::Duration;

/// Top-level error type for the stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to emit record to destination {destination}: {reason}")]
    Emit { destination: String, reason: String },

    #[error("Stage is not accepting records (state: {state})")]
    Closed { state: &'static str },

    #[error("Run stop requested")]
    Stopped,
}

/// Fatal configuration errors. Any of these stops the entire run —
/// they are never retried and never routed to the failure channel.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing provider credential: {name}")]
    MissingCredential { name: &'static str },

    #[error("Missing required field name: {field}")]
    MissingFieldName { field: &'static str },

    #[error("Field {field} (configured as '{name}') not found in input shape")]
    FieldNotFound { field: &'static str, name: String },

    #[error("Destination '{name}' does not resolve to a downstream stage")]
    UnknownDestination { name: String },

    #[error("Success and failure destinations both name '{name}'")]
    DuplicateDestination { name: String },
}

/// Per-record provider errors. Recoverable: the record is routed to the
/// failure channel and the run continues. `Clone` because the error travels
/// inside the per-record outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Provider rejected request (code {code:?}): {message}")]
    Api { code: Option<i64>, message: String },

    #[error("Invalid provider response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Provider call timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

impl ProviderError {
    /// The provider's error code, when it reported one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// The bare error text, without the variant framing — what goes into a
    /// configured error-message output field.
    pub fn detail(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::RequestFailed { reason } | Self::InvalidResponse { reason } => reason.clone(),
            Self::Timeout { .. } => self.to_string(),
        }
    }
}

/// Result type alias for the stage.
pub type Result<T> = std::result::Result<T, Error>;
