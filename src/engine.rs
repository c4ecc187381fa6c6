//! Typed seams toward the host engine.
//!
//! The engine schedules stages, streams records between them, and resolves
//! destination names to live output queues. The stage only ever talks to it
//! through the traits below — pure I/O, no business logic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::record::Record;

// ── Output sinks ────────────────────────────────────────────────────

/// A live downstream consumer of this stage's output.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Destination name, for diagnostics.
    fn name(&self) -> &str;

    /// Hand one record downstream. Backpressure is the engine's problem —
    /// this resolves once the record is accepted.
    async fn emit(&self, record: Record) -> Result<(), Error>;

    /// Signal that no more records will arrive on this sink.
    /// Must be idempotent: the same sink may back both outcome channels.
    async fn complete(&self);
}

/// Resolves configured destination names to live sinks.
///
/// `default_sink` is always available: it is where both outcomes flow when no
/// destinations are configured, and where an unconfigured outcome falls back
/// when only one destination is configured.
pub trait DownstreamRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn RecordSink>>;
    fn default_sink(&self) -> Arc<dyn RecordSink>;
}

// ── Cooperative stop ────────────────────────────────────────────────

/// Shared run-stop flag. The engine triggers it on a fatal error anywhere in
/// the transformation; the stage triggers it when its own initialization
/// fails. Once set, no further provider calls are dispatched.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    stopped: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// ── In-process implementations ──────────────────────────────────────

/// Queue-backed sink over a tokio mpsc channel. The embedding side holds the
/// receiver; `complete()` drops the sender so the receiver sees end-of-stream.
pub struct QueueSink {
    name: String,
    tx: std::sync::Mutex<Option<mpsc::UnboundedSender<Record>>>,
}

impl QueueSink {
    pub fn new(name: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<Record>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            name: name.into(),
            tx: std::sync::Mutex::new(Some(tx)),
        });
        (sink, rx)
    }
}

#[async_trait]
impl RecordSink for QueueSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&self, record: Record) -> Result<(), Error> {
        let guard = self.tx.lock().map_err(|_| Error::Emit {
            destination: self.name.clone(),
            reason: "sink lock poisoned".into(),
        })?;
        let tx = guard.as_ref().ok_or_else(|| Error::Emit {
            destination: self.name.clone(),
            reason: "sink already completed".into(),
        })?;
        tx.send(record).map_err(|_| Error::Emit {
            destination: self.name.clone(),
            reason: "receiver dropped".into(),
        })
    }

    async fn complete(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }
}

/// Name-to-sink map with an always-present default, the in-process stand-in
/// for the engine's output-queue lookup.
pub struct InMemoryRegistry {
    default_sink: Arc<dyn RecordSink>,
    named: HashMap<String, Arc<dyn RecordSink>>,
}

impl InMemoryRegistry {
    pub fn new(default_sink: Arc<dyn RecordSink>) -> Self {
        Self {
            default_sink,
            named: HashMap::new(),
        }
    }

    pub fn with_sink(mut self, name: impl Into<String>, sink: Arc<dyn RecordSink>) -> Self {
        self.named.insert(name.into(), sink);
        self
    }
}

impl DownstreamRegistry for InMemoryRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn RecordSink>> {
        self.named.get(name).cloned()
    }

    fn default_sink(&self) -> Arc<dyn RecordSink> {
        Arc::clone(&self.default_sink)
    }
}
