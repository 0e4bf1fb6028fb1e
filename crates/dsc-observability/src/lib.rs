//! # dsc-observability
//!
//! Structured logging for processes that embed the dataspace connector
//! controller.
//!
//! The controller crates only emit `tracing` events and spans; installing a
//! subscriber is left to the embedding process, which can do so with
//! [`init_logging`] or [`init_logging_with_config`].

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
