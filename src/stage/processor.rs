//! Record processor — drives one record at a time through resolution,
//! validation, dispatch, and routing.
//!
//! The run is a small state machine: the first record triggers field
//! resolution and shape extension (once), then every record is validated,
//! dispatched to the provider, and emitted to exactly one outcome channel.
//! Resolution failure aborts the whole run; every later failure is a
//! per-record outcome on the failure channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::StageConfig;
use crate::engine::{DownstreamRegistry, StopFlag};
use crate::error::{ConfigError, Error};
use crate::provider::{SmsProvider, SmsRequest};
use crate::record::{Record, Shape, Value};
use crate::stage::router::DispatchRouter;
use crate::stage::schema::{self, OutputLayout, ResolvedFields};
use crate::stage::types::{DispatchOutcome, RouteTag};

/// Progress line interval, in records.
const FEEDBACK_EVERY: u64 = 1000;

/// Per-run state, fixed at the first record.
#[derive(Debug, Clone)]
struct ResolvedRun {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    fields: ResolvedFields,
    layout: OutputLayout,
}

enum RunState {
    Uninitialized,
    Streaming(ResolvedRun),
    Done,
    Aborted,
}

impl RunState {
    fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Streaming(_) => "streaming",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

/// The stage orchestrator.
///
/// Single-threaded per instance: one record is fully processed before the
/// next is accepted. The host engine may run independent copies over record
/// partitions; no state is shared between them.
pub struct RecordProcessor {
    config: StageConfig,
    provider: Arc<dyn SmsProvider>,
    router: DispatchRouter,
    stop: StopFlag,
    state: RunState,
    records_seen: u64,
}

impl std::fmt::Debug for RecordProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordProcessor")
            .field("provider", &self.provider.name())
            .field("router", &self.router)
            .field("state", &self.state.label())
            .field("records_seen", &self.records_seen)
            .finish()
    }
}

impl RecordProcessor {
    /// Build a processor. Validates the configuration and resolves the
    /// configured destinations — both fatal if they fail, before any record
    /// is accepted.
    pub fn new(
        config: StageConfig,
        provider: Arc<dyn SmsProvider>,
        registry: &dyn DownstreamRegistry,
        stop: StopFlag,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let router = DispatchRouter::from_config(&config, registry)?;
        Ok(Self {
            config,
            provider,
            router,
            stop,
            state: RunState::Uninitialized,
            records_seen: 0,
        })
    }

    /// The run's output shape, available once the first record (or an
    /// explicit [`prepare`](Self::prepare)) has fixed it.
    pub fn output_shape(&self) -> Option<&Arc<Shape>> {
        match &self.state {
            RunState::Streaming(run) => Some(&run.layout.shape),
            _ => None,
        }
    }

    /// Resolve field indices and the output shape against an input shape.
    ///
    /// Runs once; later calls return the already-fixed shape. The engine may
    /// call this ahead of the first record to bind downstream stages to the
    /// output shape. Resolution failure aborts the run and raises the shared
    /// stop flag — the whole transformation halts, not just this stage.
    pub fn prepare(&mut self, input_shape: &Shape) -> Result<Arc<Shape>, Error> {
        match &self.state {
            RunState::Streaming(run) => return Ok(Arc::clone(&run.layout.shape)),
            RunState::Done | RunState::Aborted => {
                return Err(Error::Closed {
                    state: self.state.label(),
                });
            }
            RunState::Uninitialized => {}
        }

        let fields = match schema::resolve_fields(input_shape, &self.config) {
            Ok(fields) => fields,
            Err(e) => {
                error!(error = %e, "Field resolution failed, aborting run");
                self.state = RunState::Aborted;
                self.stop.trigger();
                return Err(e.into());
            }
        };
        let layout = schema::extend_shape(input_shape, &self.config);

        let run = ResolvedRun {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            fields,
            layout,
        };
        info!(
            run_id = %run.run_id,
            recipient_idx = run.fields.recipient,
            sender_idx = run.fields.sender,
            message_idx = run.fields.message,
            output_fields = run.layout.shape.len(),
            "Resolved input fields and output shape"
        );
        let shape = Arc::clone(&run.layout.shape);
        self.state = RunState::Streaming(run);
        Ok(shape)
    }

    /// Process one record: extend, validate, dispatch, fill result fields,
    /// and emit to exactly one channel.
    ///
    /// `Ok` carries the channel the record went to. `Err` is fatal: a
    /// configuration error on the first record, a closed downstream queue, or
    /// an observed stop request (the record is not dispatched or emitted).
    pub async fn process(&mut self, record: Record) -> Result<RouteTag, Error> {
        if matches!(self.state, RunState::Done | RunState::Aborted) {
            return Err(Error::Closed {
                state: self.state.label(),
            });
        }
        if self.stop.is_stopped() {
            debug!("Stop requested; refusing to dispatch");
            return Err(Error::Stopped);
        }

        let input_shape = Arc::clone(record.shape());
        self.prepare(&input_shape)?;
        let run = match &self.state {
            RunState::Streaming(run) => run.clone(),
            _ => {
                return Err(Error::Closed {
                    state: self.state.label(),
                });
            }
        };

        let mut record = record.resized_to(Arc::clone(&run.layout.shape));
        let outcome = self.dispatch(&record, &run.fields).await;
        fill_result_fields(&mut record, &run.layout, &outcome);

        let tag = DispatchRouter::tag(&outcome);
        debug!(
            run_id = %run.run_id,
            outcome = outcome.label(),
            route = ?tag,
            "Dispatched record"
        );
        self.router.deliver(tag, record).await?;

        self.records_seen += 1;
        if self.records_seen % FEEDBACK_EVERY == 0 {
            info!(run_id = %run.run_id, lines = self.records_seen, "Progress");
        }
        Ok(tag)
    }

    /// Validate required values and credentials, then call the provider.
    ///
    /// Credentials are read fresh from the configuration on every record.
    /// Any empty required value short-circuits without contacting the
    /// provider.
    async fn dispatch(&self, record: &Record, fields: &ResolvedFields) -> DispatchOutcome {
        if !self.config.credentials.is_complete() {
            error!("Provider credentials are empty at dispatch time");
            return DispatchOutcome::Invalid {
                reason: "provider credentials are empty".into(),
            };
        }

        let to = match required_text(record, "recipient", fields.recipient) {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };
        let from = match required_text(record, "sender", fields.sender) {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };
        let body = match required_text(record, "message", fields.message) {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        let request = SmsRequest { to, from, body };
        match self
            .provider
            .send(request, &self.config.credentials)
            .await
        {
            Ok(receipt) => DispatchOutcome::Sent(receipt),
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Message creation failed");
                DispatchOutcome::ProviderFailure(e)
            }
        }
    }

    /// Upstream signalled end of input: complete all output channels.
    pub async fn finish(&mut self) -> Result<(), Error> {
        match &self.state {
            RunState::Aborted => {
                return Err(Error::Closed { state: "aborted" });
            }
            RunState::Done => return Ok(()),
            RunState::Streaming(run) => {
                info!(
                    run_id = %run.run_id,
                    records = self.records_seen,
                    started_at = %run.started_at,
                    "Run complete"
                );
            }
            RunState::Uninitialized => {
                info!("Run complete without receiving any records");
            }
        }
        self.state = RunState::Done;
        self.router.complete().await;
        Ok(())
    }

    /// Drive the processor from a record stream until it ends or the run is
    /// stopped, then finish.
    ///
    /// Per-record dispatch failures are handled inside [`process`] and do not
    /// surface here; only fatal errors end the run early.
    pub async fn run(
        &mut self,
        mut source: impl Stream<Item = Record> + Unpin,
    ) -> Result<(), Error> {
        while let Some(record) = source.next().await {
            match self.process(record).await {
                Ok(_) => {}
                Err(Error::Stopped) => {
                    info!("Run stopped cooperatively");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        self.finish().await
    }
}

/// Read a required text value, or the validation outcome that skips the
/// provider call.
fn required_text(record: &Record, name: &str, idx: usize) -> Result<String, DispatchOutcome> {
    match record.get(idx) {
        value if value.is_empty() => {
            error!(field = name, "Required value is empty; skipping provider call");
            Err(DispatchOutcome::Invalid {
                reason: format!("{name} is empty"),
            })
        }
        Value::Text(text) => Ok(text.clone()),
        _ => {
            error!(field = name, "Required value is not text");
            Err(DispatchOutcome::Invalid {
                reason: format!("{name} is not a text value"),
            })
        }
    }
}

/// Copy outcome data into the configured result fields. Fields the outcome
/// has no data for stay at their default value; the shape never changes.
fn fill_result_fields(record: &mut Record, layout: &OutputLayout, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Sent(receipt) => {
            if let Some(idx) = layout.status {
                record.set(idx, Value::Text(receipt.status.clone()));
            }
            if let (Some(idx), Some(price)) = (layout.price, &receipt.price) {
                record.set(idx, Value::Text(price.clone()));
            }
            if let (Some(idx), Some(code)) = (layout.error_code, receipt.error_code) {
                record.set(idx, Value::Integer(code));
            }
            if let (Some(idx), Some(message)) = (layout.error_message, &receipt.error_message) {
                record.set(idx, Value::Text(message.clone()));
            }
        }
        DispatchOutcome::ProviderFailure(e) => {
            if let (Some(idx), Some(code)) = (layout.error_code, e.code()) {
                record.set(idx, Value::Integer(code));
            }
            if let Some(idx) = layout.error_message {
                record.set(idx, Value::Text(e.detail()));
            }
        }
        // No provider contact — nothing beyond defaults.
        DispatchOutcome::Invalid { .. } => {}
    }
}
