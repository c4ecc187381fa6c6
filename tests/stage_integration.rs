//! End-to-end runs of the SMS stage over an in-memory engine and a scripted
//! provider: mixed success/failure batches, destination splitting, and the
//! single-destination fallback.

use std::sync::Arc;

use async_trait::async_trait;

use sms_relay::config::{ProviderCredentials, StageConfig};
use sms_relay::engine::{InMemoryRegistry, QueueSink, StopFlag};
use sms_relay::error::ProviderError;
use sms_relay::provider::{SmsProvider, SmsReceipt, SmsRequest};
use sms_relay::record::{FieldDef, Record, Shape, Value};
use sms_relay::stage::processor::RecordProcessor;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Provider scripted by recipient number: `+1555FAIL...` gets a "failed"
/// delivery receipt, `+1555REJECT...` gets an API rejection, anything else is
/// queued.
struct ScriptedProvider;

#[async_trait]
impl SmsProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(
        &self,
        request: SmsRequest,
        _credentials: &ProviderCredentials,
    ) -> Result<SmsReceipt, ProviderError> {
        if request.to.starts_with("+1555FAIL") {
            return Ok(SmsReceipt {
                status: "failed".into(),
                price: None,
                error_code: Some(30003),
                error_message: Some("Unreachable destination handset".into()),
            });
        }
        if request.to.starts_with("+1555REJECT") {
            return Err(ProviderError::Api {
                code: Some(21211),
                message: format!("Invalid 'To' phone number: {}", request.to),
            });
        }
        Ok(SmsReceipt {
            status: "queued".into(),
            price: Some("-0.00750".into()),
            error_code: None,
            error_message: None,
        })
    }
}

fn input_shape() -> Arc<Shape> {
    Arc::new(Shape::new(vec![
        FieldDef::text("to"),
        FieldDef::text("from"),
        FieldDef::text("body"),
    ]))
}

fn record(to: &str) -> Record {
    Record::new(
        input_shape(),
        vec![to.into(), "+15559876543".into(), "hi".into()],
    )
}

fn config() -> StageConfig {
    StageConfig {
        credentials: ProviderCredentials::new("AC123", "token"),
        recipient_field: "to".into(),
        sender_field: "from".into(),
        message_field: "body".into(),
        status_field: Some("sms_status".into()),
        price_field: Some("sms_price".into()),
        error_code_field: Some("sms_error_code".into()),
        error_message_field: Some("sms_error".into()),
        ..Default::default()
    }
}

async fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<Record>) -> Vec<Record> {
    let mut out = Vec::new();
    while let Some(record) = rx.recv().await {
        out.push(record);
    }
    out
}

#[tokio::test]
async fn split_destinations_route_each_outcome_once() {
    init_tracing();
    let (default_sink, default_rx) = QueueSink::new("default");
    let (sent, sent_rx) = QueueSink::new("sent");
    let (dead, dead_rx) = QueueSink::new("dead_letter");
    let registry = InMemoryRegistry::new(default_sink)
        .with_sink("sent", sent)
        .with_sink("dead_letter", dead);

    let cfg = StageConfig {
        success_destination: Some("sent".into()),
        failure_destination: Some("dead_letter".into()),
        ..config()
    };
    let mut processor =
        RecordProcessor::new(cfg, Arc::new(ScriptedProvider), &registry, StopFlag::new()).unwrap();

    let records = vec![
        record("+15551230001"),
        record("+1555FAIL0002"),
        record("+1555REJECT03"),
        record(""), // validation failure
        record("+15551230004"),
    ];
    processor.run(tokio_stream::iter(records)).await.unwrap();

    let sent = drain(sent_rx).await;
    let dead = drain(dead_rx).await;
    let default = drain(default_rx).await;

    assert_eq!(sent.len(), 2);
    assert_eq!(dead.len(), 3);
    assert!(default.is_empty());

    // Success records carry status and price from the receipt.
    let shape = sent[0].shape().clone();
    let status_idx = shape.index_of("sms_status").unwrap();
    let price_idx = shape.index_of("sms_price").unwrap();
    for r in &sent {
        assert_eq!(r.get(status_idx).as_text(), Some("queued"));
        assert_eq!(r.get(price_idx).as_text(), Some("-0.00750"));
    }

    // The delivery failure carries the provider's error details.
    let code_idx = shape.index_of("sms_error_code").unwrap();
    let msg_idx = shape.index_of("sms_error").unwrap();
    let delivery_failure = dead
        .iter()
        .find(|r| r.get(status_idx).as_text() == Some("failed"))
        .unwrap();
    assert_eq!(*delivery_failure.get(code_idx), Value::Integer(30003));
    assert_eq!(
        delivery_failure.get(msg_idx).as_text(),
        Some("Unreachable destination handset")
    );

    // The validation failure carries nothing beyond defaults.
    let validation_failure = dead
        .iter()
        .find(|r| r.get(0).is_empty())
        .unwrap();
    assert_eq!(*validation_failure.get(status_idx), Value::Null);
    assert_eq!(*validation_failure.get(code_idx), Value::Null);
    assert_eq!(*validation_failure.get(msg_idx), Value::Null);
}

#[tokio::test]
async fn unsplit_run_sends_everything_to_the_default_output() {
    init_tracing();
    let (default_sink, default_rx) = QueueSink::new("default");
    let registry = InMemoryRegistry::new(default_sink);
    let mut processor = RecordProcessor::new(
        config(),
        Arc::new(ScriptedProvider),
        &registry,
        StopFlag::new(),
    )
    .unwrap();

    let records = vec![
        record("+15551230001"),
        record("+1555FAIL0002"),
        record("+1555REJECT03"),
    ];
    processor.run(tokio_stream::iter(records)).await.unwrap();

    // 100% of records, success and failure alike, on the single output.
    assert_eq!(drain(default_rx).await.len(), 3);
}

#[tokio::test]
async fn lone_failure_destination_does_not_drop_successes() {
    init_tracing();
    let (default_sink, default_rx) = QueueSink::new("default");
    let (dead, dead_rx) = QueueSink::new("dead_letter");
    let registry = InMemoryRegistry::new(default_sink).with_sink("dead_letter", dead);

    let cfg = StageConfig {
        failure_destination: Some("dead_letter".into()),
        ..config()
    };
    let mut processor =
        RecordProcessor::new(cfg, Arc::new(ScriptedProvider), &registry, StopFlag::new()).unwrap();

    let records = vec![record("+15551230001"), record("+1555FAIL0002")];
    processor.run(tokio_stream::iter(records)).await.unwrap();

    // The success record falls back to the default output.
    assert_eq!(drain(default_rx).await.len(), 1);
    assert_eq!(drain(dead_rx).await.len(), 1);
}

#[tokio::test]
async fn output_shape_is_stable_across_the_whole_run() {
    init_tracing();
    let (default_sink, default_rx) = QueueSink::new("default");
    let registry = InMemoryRegistry::new(default_sink);
    let mut processor = RecordProcessor::new(
        config(),
        Arc::new(ScriptedProvider),
        &registry,
        StopFlag::new(),
    )
    .unwrap();

    let published = processor.prepare(&input_shape()).unwrap();
    assert_eq!(published.len(), 7);

    let records = vec![record("+15551230001"), record(""), record("+1555REJECT03")];
    processor.run(tokio_stream::iter(records)).await.unwrap();

    for r in drain(default_rx).await {
        assert_eq!(r.shape(), &published);
        assert_eq!(r.values().len(), 7);
    }
}
