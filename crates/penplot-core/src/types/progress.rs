//! Progress reporting and cooperative cancellation.
//!
//! Long-running operations take a plain callback invoked synchronously at
//! well-defined points (one burst sent, one acknowledgment received) and a
//! [`CancelFlag`] polled at every read attempt or queue-capacity check.
//! There is no forced interruption: an in-flight blocking read finishes or
//! times out before the flag is seen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Units of work completed out of a known total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Completed units
    pub done: u64,
    /// Total units
    pub total: u64,
}

impl Progress {
    /// Create a progress value
    pub const fn new(done: u64, total: u64) -> Self {
        Self { done, total }
    }

    /// Completion as a fraction in `0.0..=1.0`; an empty job is complete
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.done.min(self.total) as f64) / (self.total as f64)
    }

    /// Completion percentage rounded to the nearest integer
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    /// True once every unit is done
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}

/// Shared cooperative cancellation flag
///
/// Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// New flag in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the flag can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
