//! Multi-source byte reading.
//!
//! A [`SourceSet`] reads fixed-size buffers from an ordered list of files (or
//! standard input), optionally cycling over them live. A [`Watcher`] grows and
//! shrinks a live set from paths announced on a control channel.

mod handle;
mod set;
mod watcher;

use std::path::PathBuf;
use std::time::Duration;

pub use handle::{STDIN_NAME, Source, SourceKind};
pub use set::SourceSet;
pub use watcher::{IgnoreReason, WatchEvent, Watcher};

/// Delay between live passes when nothing is configured.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// How long a watch poll waits for the next announced path.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings for opening a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSetConfig {
    /// Files to read, in order. Empty means the default input.
    pub paths: Vec<PathBuf>,
    /// Keep re-reading sources after they are exhausted.
    pub live: bool,
    /// Take new paths from standard input (requires `live`).
    pub watch: bool,
    /// Pause between live passes.
    pub latency: Duration,
    /// Watch poll timeout.
    pub poll_timeout: Duration,
    /// Extend chunks to end on a newline.
    pub line_aligned: bool,
}

impl SourceSetConfig {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            ..Default::default()
        }
    }
}

impl Default for SourceSetConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            live: false,
            watch: false,
            latency: DEFAULT_LATENCY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            line_aligned: false,
        }
    }
}
