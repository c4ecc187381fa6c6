//! SMS relay — an SMS-dispatch stage for record pipelines.

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod record;
pub mod stage;
