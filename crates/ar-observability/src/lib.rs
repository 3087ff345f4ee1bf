//! # ar-observability
//!
//! Logging infrastructure for Asset Relay, built on the tracing ecosystem.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
