//! The engine handle: the one object collaborators talk to.
//!
//! An [`Engine`] is constructed explicitly with [`Engine::start`] and
//! shared by reference (usually inside an `Arc`). It owns the arbitration
//! task, the optional reporter task, and the producer half of the event
//! queue.
//!
//! # Winner visibility
//!
//! [`Engine::submit`] answers "is this participant the winner right now",
//! read immediately after the record was handed off. A record that went
//! through the queue has usually not been arbitrated yet at that point,
//! so a winning submission can get `false` back; later reads
//! ([`Engine::get_winner`], [`Engine::get_stats`]) show the claim once the
//! loop reaches it. A record arbitrated inline is already reflected.

use std::sync::Arc;
use std::time::Duration;

use buzzer_types::{EngineNotification, StatsSnapshot, Submission};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::arbiter::{Arbiter, run_arbiter};
use crate::config::EngineConfig;
use crate::lifecycle::{Lifecycle, ShutdownOutcome};
use crate::queue::EventQueue;
use crate::reporter::run_reporter;
use crate::state::{ArbitrationPath, EpochSummary};

/// First-correct-answer arbitration engine.
#[derive(Debug)]
pub struct Engine {
    arbiter: Arc<Arbiter>,
    queue: EventQueue,
    lifecycle: Lifecycle,
}

impl Engine {
    /// Start an engine: fresh epoch, arbitration loop, and (when
    /// `report_interval_ms > 0`) the live-stats reporter.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &EngineConfig) -> Self {
        let arbiter = Arc::new(Arbiter::new(config.notification_capacity));
        let (queue, rx) = EventQueue::bounded(config.queue_capacity);
        let lifecycle = Lifecycle::new();

        let handle = tokio::spawn(run_arbiter(
            Arc::clone(&arbiter),
            rx,
            lifecycle.stop_signal(),
        ));
        lifecycle.register("arbiter", handle);

        if config.report_interval_ms > 0 {
            let handle = tokio::spawn(run_reporter(
                Arc::clone(&arbiter),
                queue.clone(),
                Duration::from_millis(config.report_interval_ms),
                lifecycle.stop_signal(),
            ));
            lifecycle.register("reporter", handle);
        }

        info!(
            queue_capacity = queue.capacity(),
            report_interval_ms = config.report_interval_ms,
            "Engine started"
        );

        Self {
            arbiter,
            queue,
            lifecycle,
        }
    }

    /// Hand a record to the engine and report whether its participant is
    /// the recorded winner at the moment of return.
    ///
    /// A record without a timestamp is stamped with the current time. If
    /// the queue refuses the record (full, or closed after shutdown) it is
    /// arbitrated inline on the caller's thread. No record is dropped.
    pub fn submit(&self, record: Submission) -> bool {
        let record = record.stamped(Utc::now());
        let participant_id = record.participant_id;

        if self.lifecycle.is_stop_requested() {
            debug!(participant_id, "Engine shut down, processing synchronously");
            self.arbiter.arbitrate(record, ArbitrationPath::Inline);
        } else if let Err(refused) = self.queue.try_enqueue(record) {
            warn!(
                participant_id,
                reason = refused.reason(),
                "Event queue unavailable, processing synchronously"
            );
            self.arbiter
                .arbitrate(refused.into_inner(), ArbitrationPath::Inline);
        }

        self.arbiter.is_winner(participant_id)
    }

    /// The winning record of the current epoch, if one was claimed.
    pub fn get_winner(&self) -> Option<Submission> {
        self.arbiter.winner()
    }

    /// Consistent snapshot of the current epoch.
    pub fn get_stats(&self) -> StatsSnapshot {
        let depth = u64::try_from(self.queue.depth()).unwrap_or(u64::MAX);
        self.arbiter.snapshot(depth)
    }

    /// Close the current epoch and start a new one.
    ///
    /// Records still queued are not purged; they are arbitrated into the
    /// new epoch.
    pub fn reset(&self) -> EpochSummary {
        self.arbiter.reset()
    }

    /// Wait until every record enqueued before this call has been
    /// arbitrated. Returns at once after shutdown.
    pub async fn flush(&self) {
        if self.lifecycle.is_stop_requested() {
            return;
        }
        if let Some(ack) = self.queue.barrier().await {
            let _ = ack.await;
        }
    }

    /// Subscribe to winner and reset notifications.
    ///
    /// Notifications arrive in the order the state changed: a
    /// `WinnerDeclared` is always delivered before the `EpochReset` that
    /// closes its epoch.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotification> {
        self.arbiter.subscribe()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.lifecycle.is_stop_requested()
    }

    /// Stop the background tasks and wait for them to finish.
    ///
    /// The record being arbitrated when the signal arrives completes;
    /// records still waiting in the queue are not processed. Safe to call
    /// any number of times, concurrently or not.
    pub async fn shutdown(&self) {
        if self.lifecycle.shutdown().await == ShutdownOutcome::Stopped {
            let snap = self.get_stats();
            info!(
                epoch = %snap.epoch_id,
                total = snap.total_responses,
                correct = snap.correct_responses,
                winner = ?snap.winner.map(|w| w.participant_id),
                "Engine stopped"
            );
        }
    }
}
