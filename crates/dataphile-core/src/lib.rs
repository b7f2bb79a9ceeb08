//! dataphile-core: Shared components for the dataphile streaming tools.
//!
//! This crate contains the ambient plumbing used by the `dataphile` library
//! and its command-line front end:
//!
//! - `config` - YAML configuration with defaults and validation
//! - `metrics/` - Internal metric events and the `emit!` macro
//! - `signal` - Signal handling for graceful shutdown
//! - `tracing` - Subscriber initialization for the CLI
//! - `error` - Configuration error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod signal;
pub mod tracing;

// Re-export commonly used items
pub use config::{Config, KB, MB};
pub use error::ConfigError;
pub use signal::{cancel_on_signal, shutdown_signal};
pub use self::tracing::init_tracing;
