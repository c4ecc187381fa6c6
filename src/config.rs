//! Stage configuration.
//!
//! The persisted form of this configuration is owned by the host engine's
//! metadata layer — the stage only ever sees the materialized struct below.

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Provider account credentials. Held as secrets; exposed only at the
/// provider boundary, read fresh per record so rotation is possible.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub account_sid: SecretString,
    pub auth_token: SecretString,
}

impl ProviderCredentials {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: SecretString::from(account_sid.into()),
            auth_token: SecretString::from(auth_token.into()),
        }
    }

    /// True when both secrets are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.account_sid.expose_secret().is_empty() && !self.auth_token.expose_secret().is_empty()
    }
}

/// Materialized configuration for one SMS stage instance.
///
/// The three input field names are mandatory. The four output field names are
/// optional: an unset (or empty) name means that result field is not appended
/// to the output shape. Destinations are optional: unset means the outcome
/// flows to the single default output.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub credentials: ProviderCredentials,
    /// Input field holding the recipient phone number.
    pub recipient_field: String,
    /// Input field holding the sender phone number.
    pub sender_field: String,
    /// Input field holding the message body.
    pub message_field: String,
    /// Output field for the provider-reported delivery status.
    pub status_field: Option<String>,
    /// Output field for the provider-reported price.
    pub price_field: Option<String>,
    /// Output field for the provider-reported error code.
    pub error_code_field: Option<String>,
    /// Output field for the provider-reported error message.
    pub error_message_field: Option<String>,
    /// Destination for successfully delivered records.
    pub success_destination: Option<String>,
    /// Destination for failed records.
    pub failure_destination: Option<String>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            credentials: ProviderCredentials::new("", ""),
            recipient_field: String::new(),
            sender_field: String::new(),
            message_field: String::new(),
            // Pre-filled like the original step: status is the one result
            // field most transformations want.
            status_field: Some("status".to_string()),
            price_field: None,
            error_code_field: None,
            error_message_field: None,
            success_destination: None,
            failure_destination: None,
        }
    }
}

/// Empty strings count as unconfigured, matching the persisted form where a
/// blank text box and an absent tag are the same thing.
fn configured(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|n| !n.is_empty())
}

impl StageConfig {
    pub fn status_field(&self) -> Option<&str> {
        configured(&self.status_field)
    }

    pub fn price_field(&self) -> Option<&str> {
        configured(&self.price_field)
    }

    pub fn error_code_field(&self) -> Option<&str> {
        configured(&self.error_code_field)
    }

    pub fn error_message_field(&self) -> Option<&str> {
        configured(&self.error_message_field)
    }

    pub fn success_destination(&self) -> Option<&str> {
        configured(&self.success_destination)
    }

    pub fn failure_destination(&self) -> Option<&str> {
        configured(&self.failure_destination)
    }

    /// Check the fatal invariants before any record flows.
    ///
    /// Credentials and the three mandatory field names must be present, and
    /// the two destinations may not name the same downstream stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.account_sid.expose_secret().is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "account_sid",
            });
        }
        if self.credentials.auth_token.expose_secret().is_empty() {
            return Err(ConfigError::MissingCredential { name: "auth_token" });
        }
        if self.recipient_field.is_empty() {
            return Err(ConfigError::MissingFieldName { field: "recipient" });
        }
        if self.sender_field.is_empty() {
            return Err(ConfigError::MissingFieldName { field: "sender" });
        }
        if self.message_field.is_empty() {
            return Err(ConfigError::MissingFieldName { field: "message" });
        }
        if let (Some(success), Some(failure)) =
            (self.success_destination(), self.failure_destination())
            && success == failure
        {
            return Err(ConfigError::DuplicateDestination {
                name: success.to_string(),
            });
        }
        Ok(())
    }
}
