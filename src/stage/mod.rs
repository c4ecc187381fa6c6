//! The SMS stage core.
//!
//! One record at a time flows through:
//! 1. `schema` — first record only: resolve configured field names to
//!    positions and extend the shape with the configured result fields
//! 2. `processor` — validate values and credentials, call the provider
//! 3. `router` — tag the outcome and emit to exactly one downstream sink
//!
//! Only field resolution and destination resolution are fatal. Every
//! per-record failure is routed to the failure channel and the run continues.

pub mod processor;
pub mod router;
pub mod schema;
pub mod types;
