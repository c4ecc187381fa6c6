//! Twilio REST provider.
//!
//! Form-encoded `POST` to the Messages endpoint with HTTP basic auth. The
//! client is built from the given credentials on every call — there is no
//! shared mutable auth state, so parallel stage copies can't trip over each
//! other's credentials.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::ProviderCredentials;
use crate::error::ProviderError;
use crate::provider::{SmsProvider, SmsReceipt, SmsRequest};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Call-level timeout; the stage itself imposes none.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// SMS provider backed by the Twilio REST API.
pub struct TwilioProvider {
    base_url: String,
    timeout: Duration,
}

impl TwilioProvider {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point at a different API host (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
            self.base_url
        )
    }

    /// Build a client for one call. Idempotent — no state survives the call.
    fn build_client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed {
                reason: e.to_string(),
            })
    }
}

impl Default for TwilioProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsProvider for TwilioProvider {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn send(
        &self,
        request: SmsRequest,
        credentials: &ProviderCredentials,
    ) -> Result<SmsReceipt, ProviderError> {
        let account_sid = credentials.account_sid.expose_secret();
        let auth_token = credentials.auth_token.expose_secret();

        let client = self.build_client()?;
        let params = [
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Body", request.body.as_str()),
        ];

        let resp = client
            .post(self.messages_url(account_sid))
            .basic_auth(account_sid, Some(auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout: self.timeout,
                    }
                } else {
                    ProviderError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            let message: MessageResponse =
                resp.json()
                    .await
                    .map_err(|e| ProviderError::InvalidResponse {
                        reason: e.to_string(),
                    })?;
            return Ok(message.into());
        }

        // Twilio error bodies carry {"code": 21211, "message": "..."}.
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => Err(ProviderError::Api {
                code: err.code,
                message: err.message,
            }),
            Err(_) => {
                tracing::warn!(status = %status, "Twilio error response was not JSON");
                Err(ProviderError::Api {
                    code: None,
                    message: format!("HTTP {status}: {body}"),
                })
            }
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
}

impl From<MessageResponse> for SmsReceipt {
    fn from(m: MessageResponse) -> Self {
        Self {
            status: m.status,
            price: m.price,
            error_code: m.error_code,
            error_message: m.error_message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}
