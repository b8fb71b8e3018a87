//! Shared application state for the API server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use buzzer_core::Engine;

/// Every this many received submissions a progress line is logged.
pub const PROGRESS_LOG_EVERY: u64 = 100;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// engine is shared with whoever else drives it (console, shutdown path).
#[derive(Debug)]
pub struct AppState {
    /// The arbitration engine.
    pub engine: Arc<Engine>,
    /// Submissions received since process start. Unlike the engine's
    /// counters this is never reset.
    received: AtomicU64,
}

impl AppState {
    /// Create application state around an already started engine.
    pub const fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            received: AtomicU64::new(0),
        }
    }

    /// Count one received submission and return the running total.
    pub fn record_received(&self) -> u64 {
        self.received
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }

    /// Submissions received since process start.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }
}
