//! Messaging provider boundary.
//!
//! The stage talks to the external SMS service through [`SmsProvider`] only.
//! Tests and embedders swap in their own implementations; production uses
//! [`twilio::TwilioProvider`].

pub mod twilio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProviderCredentials;
use crate::error::ProviderError;

pub use twilio::TwilioProvider;

/// One send request, built from resolved field values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsRequest {
    /// Recipient phone number.
    pub to: String,
    /// Sender phone number.
    pub from: String,
    /// Message body.
    pub body: String,
}

/// The provider's structured response to an accepted send request.
///
/// A receipt does not imply delivery: a `status` of `"failed"` means the API
/// call succeeded but the SMS did not go out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsReceipt {
    /// Provider-reported delivery status ("queued", "sent", "failed", ...).
    pub status: String,
    /// Price charged, as the provider reports it.
    pub price: Option<String>,
    /// Provider error code, when delivery failed.
    pub error_code: Option<i64>,
    /// Provider error message, when delivery failed.
    pub error_message: Option<String>,
}

impl SmsReceipt {
    /// A minimal receipt carrying only a delivery status.
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            price: None,
            error_code: None,
            error_message: None,
        }
    }
}

/// External SMS-sending service, invoked once per record.
///
/// Credentials are passed per call rather than held by the provider, so a
/// rotated secret takes effect on the next record.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Provider name, for diagnostics.
    fn name(&self) -> &str;

    /// Authenticate and submit a single send request.
    ///
    /// `Err` means the provider rejected or failed the request — a per-record
    /// outcome, never retried here.
    async fn send(
        &self,
        request: SmsRequest,
        credentials: &ProviderCredentials,
    ) -> Result<SmsReceipt, ProviderError>;
}
