//! Lifecycle control shared by the engine and its background tasks.
//!
//! The engine owns every task it spawns. Handles are registered here at
//! start-up and drained by [`Lifecycle::shutdown`], which signals stop,
//! then awaits each task. Callers that arrive while a shutdown is in
//! progress wait on the same handle list, so every call returns only once
//! the tasks are gone.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a [`Lifecycle::shutdown`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// This call raised the stop signal and joined the tasks.
    Stopped,
    /// Shutdown had already been requested by an earlier call.
    AlreadyStopped,
}

/// Stop signal plus the handles of the tasks that watch it.
#[derive(Debug)]
pub struct Lifecycle {
    stop_tx: watch::Sender<bool>,
    stop_requested: AtomicBool,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    started_at: DateTime<Utc>,
}

impl Lifecycle {
    /// Create a lifecycle with no tasks and the stop signal lowered.
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            stop_tx,
            stop_requested: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            started_at: Utc::now(),
        }
    }

    /// A receiver that observes the stop signal.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Hand ownership of a spawned task to the lifecycle.
    ///
    /// Uses `try_lock`: registration happens during start-up, before any
    /// shutdown can contend for the list. A task registered after
    /// shutdown began is aborted instead.
    pub fn register(&self, name: &'static str, handle: JoinHandle<()>) {
        if self.is_stop_requested() {
            warn!(task = name, "Task registered after shutdown, aborting");
            handle.abort();
            return;
        }
        match self.tasks.try_lock() {
            Ok(mut tasks) => tasks.push((name, handle)),
            Err(_) => {
                warn!(task = name, "Task list busy during registration, aborting");
                handle.abort();
            }
        }
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wall-clock time the lifecycle was created.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Raise the stop signal and await every registered task.
    ///
    /// Idempotent. Concurrent callers all return after the tasks have
    /// been joined; only the first reports [`ShutdownOutcome::Stopped`].
    pub async fn shutdown(&self) -> ShutdownOutcome {
        let first = !self.stop_requested.swap(true, Ordering::AcqRel);
        if first {
            self.stop_tx.send_replace(true);
            info!("Shutdown requested");
        }

        let mut tasks = self.tasks.lock().await;
        for (name, handle) in tasks.drain(..) {
            match handle.await {
                Ok(()) => debug!(task = name, "Task stopped"),
                Err(e) if e.is_cancelled() => debug!(task = name, "Task was cancelled"),
                Err(e) => warn!(task = name, error = %e, "Task ended abnormally"),
            }
        }
        drop(tasks);

        if first {
            let uptime = Utc::now().signed_duration_since(self.started_at);
            info!(uptime_ms = uptime.num_milliseconds(), "Shutdown complete");
            ShutdownOutcome::Stopped
        } else {
            ShutdownOutcome::AlreadyStopped
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test]
    async fn shutdown_stops_watching_tasks() {
        let lifecycle = Lifecycle::new();
        let finished = Arc::new(AtomicU32::new(0));

        for name in ["first", "second"] {
            let mut signal = lifecycle.stop_signal();
            let finished = Arc::clone(&finished);
            let handle = tokio::spawn(async move {
                let _ = signal.wait_for(|stopped| *stopped).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
            lifecycle.register(name, handle);
        }

        assert_eq!(lifecycle.shutdown().await, ShutdownOutcome::Stopped);
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert!(lifecycle.is_stop_requested());
    }

    #[tokio::test]
    async fn second_shutdown_is_a_no_op() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.shutdown().await, ShutdownOutcome::Stopped);
        assert_eq!(lifecycle.shutdown().await, ShutdownOutcome::AlreadyStopped);
    }

    #[tokio::test]
    async fn late_registration_is_aborted() {
        let lifecycle = Lifecycle::new();
        lifecycle.shutdown().await;

        let handle = tokio::spawn(std::future::pending::<()>());
        let abort = handle.abort_handle();
        lifecycle.register("late", handle);
        for _ in 0..16 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
