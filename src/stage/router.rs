//! Outcome routing.
//!
//! Destinations are resolved to live sinks once, at stage initialization. A
//! configured name that does not resolve is a fatal configuration error; an
//! unconfigured outcome falls back to the engine's default output, so every
//! record always has exactly one live destination.

use std::sync::Arc;

use crate::config::StageConfig;
use crate::engine::{DownstreamRegistry, RecordSink};
use crate::error::{ConfigError, Error};
use crate::record::Record;
use crate::stage::types::{DispatchOutcome, RouteTag, STATUS_FAILED};

/// Routes each record to the success or failure sink based on its outcome.
pub struct DispatchRouter {
    success: Arc<dyn RecordSink>,
    failure: Arc<dyn RecordSink>,
    /// The engine's default output. Held even when both destinations are
    /// configured away from it, so run completion closes it too.
    default: Arc<dyn RecordSink>,
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("success", &self.success.name())
            .field("failure", &self.failure.name())
            .field("default", &self.default.name())
            .finish()
    }
}

impl DispatchRouter {
    /// Resolve the configured destinations against the engine's downstream
    /// registry. Called at initialization, before any record flows.
    pub fn from_config(
        config: &StageConfig,
        registry: &dyn DownstreamRegistry,
    ) -> Result<Self, ConfigError> {
        let resolve = |name: Option<&str>| -> Result<Arc<dyn RecordSink>, ConfigError> {
            match name {
                Some(name) => {
                    registry
                        .resolve(name)
                        .ok_or_else(|| ConfigError::UnknownDestination {
                            name: name.to_string(),
                        })
                }
                None => Ok(registry.default_sink()),
            }
        };

        Ok(Self {
            success: resolve(config.success_destination())?,
            failure: resolve(config.failure_destination())?,
            default: registry.default_sink(),
        })
    }

    /// Classify an outcome. `Sent` with a "failed" delivery status counts as
    /// a failure even though the API call itself succeeded.
    pub fn tag(outcome: &DispatchOutcome) -> RouteTag {
        match outcome {
            DispatchOutcome::Sent(receipt) if receipt.status != STATUS_FAILED => RouteTag::Success,
            _ => RouteTag::Failure,
        }
    }

    pub fn sink_for(&self, tag: RouteTag) -> &Arc<dyn RecordSink> {
        match tag {
            RouteTag::Success => &self.success,
            RouteTag::Failure => &self.failure,
        }
    }

    /// Emit a record to the sink for this tag — exactly one destination.
    pub async fn deliver(&self, tag: RouteTag, record: Record) -> Result<(), Error> {
        self.sink_for(tag).emit(record).await
    }

    /// Complete every output channel: both outcome sinks and the default
    /// output. Sinks must tolerate being completed twice since any of the
    /// three may be the same queue.
    pub async fn complete(&self) {
        self.success.complete().await;
        self.failure.complete().await;
        self.default.complete().await;
    }
}
