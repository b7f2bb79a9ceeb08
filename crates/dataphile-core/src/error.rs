//! Configuration error types shared across the dataphile crates.

use snafu::prelude::*;

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Buffer size must be positive.
    #[snafu(display("Buffer size must be greater than zero"))]
    ZeroBufferSize,

    /// Live re-poll latency must be positive.
    #[snafu(display("Latency must be greater than zero"))]
    ZeroLatency,

    /// Watch poll timeout must be positive.
    #[snafu(display("Poll timeout must be greater than zero"))]
    ZeroPollTimeout,

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: std::path::PathBuf },
}
