//! dataphile: multi-source byte streaming with incremental compression.
//!
//! - [`source`] reads fixed-size buffers from files or standard input, once
//!   or live (tail -f style), with an optional watcher adding files on the fly
//! - [`codec`] runs buffers through gzip, bzip2 or xz without holding the
//!   whole input in memory
//! - [`pipeline`] wires the two to a writer

pub mod cli;
pub mod codec;
pub mod error;
pub mod pipeline;
pub mod source;

pub use cli::{CliArgs, RunPlan};
pub use codec::{Algorithm, Buffer, ChunkCodec, CodecSpec, TextEncoding, compress, decompress};
pub use error::{CodecError, PipelineError, SourceError};
pub use pipeline::{PipelineStats, run_pipeline};
pub use source::{SourceSet, SourceSetConfig, WatchEvent, Watcher};

// Re-export the ambient plumbing the binary needs
pub use dataphile_core::{Config, cancel_on_signal, init_tracing};
