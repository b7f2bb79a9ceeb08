//! Error types for the dataphile streaming engine.

use std::path::PathBuf;

use snafu::prelude::*;

// Re-export common errors
pub use dataphile_core::error::ConfigError;

/// Errors that can occur while opening or reading sources.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Invalid or ambiguous combination of paths, live and watch settings.
    #[snafu(display("Invalid source configuration: {message}"))]
    Configuration { message: String },

    /// A requested path does not reference an existing file.
    #[snafu(display("Source not found: {}", path.display()))]
    SourceNotFound { path: PathBuf },

    /// The file exists but could not be opened.
    #[snafu(display("Failed to open source {}: {source}", path.display()))]
    OpenSource {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The operating system failed a read on an open source.
    #[snafu(display("Failed to read from {name}: {source}"))]
    ReadSource {
        name: String,
        source: std::io::Error,
    },
}

/// Errors that can occur while compressing or decompressing buffers.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CodecError {
    /// Unknown compression algorithm name.
    #[snafu(display("\"{name}\" is not a valid compression scheme, must be one of gzip, bzip, lzma"))]
    UnsupportedAlgorithm { name: String },

    /// Compression level out of range for the chosen algorithm.
    #[snafu(display("Compression level {level} is out of range for {algorithm} ({min}-{max})"))]
    InvalidLevel {
        algorithm: &'static str,
        level: u32,
        min: u32,
        max: u32,
    },

    /// Input file extensions name different algorithms.
    #[snafu(display("Input files mix {first} and {second} compression, pick one with --algorithm"))]
    MixedAlgorithms {
        first: &'static str,
        second: &'static str,
    },

    /// Unknown text encoding name.
    #[snafu(display("Unsupported text encoding: {name}"))]
    UnsupportedEncoding { name: String },

    /// The decompressor rejected its input.
    #[snafu(display("Corrupt {algorithm} stream: {source}"))]
    CorruptStream {
        algorithm: &'static str,
        source: std::io::Error,
    },

    /// The compressor failed while producing output.
    #[snafu(display("Failed to {algorithm}-compress data: {source}"))]
    Compress {
        algorithm: &'static str,
        source: std::io::Error,
    },

    /// Decompressed bytes are not valid in the requested encoding.
    #[snafu(display("Decompressed data is not valid {encoding} at byte {offset}"))]
    TextDecode { encoding: &'static str, offset: u64 },

    /// Input text cannot be represented in the requested encoding.
    #[snafu(display("Input is not valid {encoding} at byte {offset}"))]
    TextEncode { encoding: &'static str, offset: u64 },

    /// The upstream source failed.
    #[snafu(display("Upstream source error: {source}"))]
    Upstream { source: SourceError },
}

impl From<SourceError> for CodecError {
    fn from(source: SourceError) -> Self {
        CodecError::Upstream { source }
    }
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Source error.
    #[snafu(display("Source error: {source}"))]
    Source { source: SourceError },

    /// Codec error.
    #[snafu(display("Codec error: {source}"))]
    Codec { source: CodecError },

    /// Failed to write output.
    #[snafu(display("Failed to write output: {source}"))]
    Write { source: std::io::Error },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<SourceError> for PipelineError {
    fn from(source: SourceError) -> Self {
        PipelineError::Source { source }
    }
}

impl From<CodecError> for PipelineError {
    fn from(source: CodecError) -> Self {
        // Unwrap source failures that travelled through a codec stream
        match source {
            CodecError::Upstream { source } => PipelineError::Source { source },
            other => PipelineError::Codec { source: other },
        }
    }
}
