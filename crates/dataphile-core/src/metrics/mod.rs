//! Metrics infrastructure.
//!
//! Events are recorded through the `metrics` facade. Nothing here installs a
//! recorder, so without one every event is a cheap no-op.

pub mod events;

/// Macro for emitting metric events.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding counter.
///
/// # Example
///
/// ```ignore
/// use dataphile_core::metrics::events::BytesRead;
///
/// emit!(BytesRead { bytes: 1024 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

// Re-export the macro at module level
pub use emit;
