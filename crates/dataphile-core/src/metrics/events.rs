//! Internal events for dataphile metrics emission.
//!
//! Each event struct represents a measurable occurrence while streaming.
//! Events implement the `InternalEvent` trait which records the corresponding
//! counter.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when bytes are read from a source.
pub struct BytesRead {
    pub bytes: u64,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes read");
        counter!("dataphile_bytes_read_total").increment(self.bytes);
    }
}

/// Event emitted when bytes are written to the output.
pub struct BytesWritten {
    pub bytes: u64,
}

impl InternalEvent for BytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes written");
        counter!("dataphile_bytes_written_total").increment(self.bytes);
    }
}

/// Event emitted when a source reaches end of data.
pub struct SourceExhausted;

impl InternalEvent for SourceExhausted {
    fn emit(self) {
        counter!("dataphile_sources_exhausted_total").increment(1);
    }
}

/// Event emitted when a source joins a running source set.
pub struct SourceAdded;

impl InternalEvent for SourceAdded {
    fn emit(self) {
        counter!("dataphile_sources_added_total").increment(1);
    }
}

/// Why a source left the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The path was re-announced after its file disappeared.
    Announced,
    /// A sweep found the backing file gone.
    Vanished,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Announced => "announced",
            RemovalReason::Vanished => "vanished",
        }
    }
}

/// Event emitted when a source is removed from a running source set.
pub struct SourceRemoved {
    pub reason: RemovalReason,
}

impl InternalEvent for SourceRemoved {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), "Source removed");
        counter!("dataphile_sources_removed_total", "reason" => self.reason.as_str())
            .increment(1);
    }
}
