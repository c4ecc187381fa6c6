//! Field resolution and output-shape extension.
//!
//! Both run exactly once per run, triggered by the first record. The results
//! are pure functions of the input shape and the configuration, so re-running
//! them on the same inputs always yields the same indices and layout.

use std::sync::Arc;

use crate::config::StageConfig;
use crate::error::ConfigError;
use crate::record::{FieldDef, Shape};

/// Positions of the three mandatory input fields within the run's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFields {
    pub recipient: usize,
    pub sender: usize,
    pub message: usize,
}

/// Map the configured field names to positions in the input shape.
///
/// Checked in fixed order recipient → sender → message; the first name that
/// cannot be found fails the run before any record is dispatched.
pub fn resolve_fields(shape: &Shape, config: &StageConfig) -> Result<ResolvedFields, ConfigError> {
    let recipient =
        shape
            .index_of(&config.recipient_field)
            .ok_or_else(|| ConfigError::FieldNotFound {
                field: "recipient",
                name: config.recipient_field.clone(),
            })?;
    let sender = shape
        .index_of(&config.sender_field)
        .ok_or_else(|| ConfigError::FieldNotFound {
            field: "sender",
            name: config.sender_field.clone(),
        })?;
    let message = shape
        .index_of(&config.message_field)
        .ok_or_else(|| ConfigError::FieldNotFound {
            field: "message",
            name: config.message_field.clone(),
        })?;
    Ok(ResolvedFields {
        recipient,
        sender,
        message,
    })
}

/// The run's output layout: the extended shape plus the position of each
/// configured result field. Identical for every record in the run, including
/// the ones that error out.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub shape: Arc<Shape>,
    pub status: Option<usize>,
    pub price: Option<usize>,
    pub error_code: Option<usize>,
    pub error_message: Option<usize>,
}

/// Append the configured result fields to the input shape, in fixed order
/// status, price, error-code, error-message. Unconfigured fields are skipped
/// and leave no hole.
pub fn extend_shape(input: &Shape, config: &StageConfig) -> OutputLayout {
    let mut extra = Vec::new();
    let mut next = input.len();
    let mut slot = |def: FieldDef| {
        extra.push(def);
        let idx = next;
        next += 1;
        idx
    };

    let status = config.status_field().map(|n| slot(FieldDef::text(n)));
    let price = config.price_field().map(|n| slot(FieldDef::text(n)));
    let error_code = config.error_code_field().map(|n| slot(FieldDef::integer(n)));
    let error_message = config.error_message_field().map(|n| slot(FieldDef::text(n)));

    OutputLayout {
        shape: Arc::new(input.with_appended(extra)),
        status,
        price,
        error_code,
        error_message,
    }
}
