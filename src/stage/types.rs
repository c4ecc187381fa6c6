//! Shared types for the stage core.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::provider::SmsReceipt;

/// Delivery status the provider reports when the API call succeeded but the
/// SMS did not go out.
pub const STATUS_FAILED: &str = "failed";

/// The tagged result of attempting to dispatch one record's message.
///
/// Built fresh per record, consumed immediately for routing and output-field
/// population, then discarded.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The provider accepted the request and returned a receipt. The receipt
    /// may still carry a "failed" delivery status.
    Sent(SmsReceipt),
    /// The provider rejected or failed the request.
    ProviderFailure(ProviderError),
    /// A required value or credential was empty; the provider was never
    /// contacted.
    Invalid { reason: String },
}

impl DispatchOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent(receipt) if receipt.status == STATUS_FAILED => "delivery_failed",
            Self::Sent(_) => "sent",
            Self::ProviderFailure(_) => "provider_failure",
            Self::Invalid { .. } => "invalid",
        }
    }
}

/// Which outcome channel a record goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTag {
    Success,
    Failure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_clone_with_their_error_details() {
        let outcome = DispatchOutcome::ProviderFailure(ProviderError::Api {
            code: Some(21211),
            message: "bad number".into(),
        });
        let copy = outcome.clone();
        assert!(matches!(
            copy,
            DispatchOutcome::ProviderFailure(ProviderError::Api { code: Some(21211), .. })
        ));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(
            DispatchOutcome::Sent(SmsReceipt::with_status("queued")).label(),
            "sent"
        );
        assert_eq!(
            DispatchOutcome::Sent(SmsReceipt::with_status("failed")).label(),
            "delivery_failed"
        );
        assert_eq!(
            DispatchOutcome::ProviderFailure(ProviderError::Api {
                code: Some(21211),
                message: "bad number".into(),
            })
            .label(),
            "provider_failure"
        );
        assert_eq!(
            DispatchOutcome::Invalid {
                reason: "empty recipient".into()
            }
            .label(),
            "invalid"
        );
    }
}
