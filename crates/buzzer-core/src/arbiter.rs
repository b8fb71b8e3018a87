//! The arbitration step and the loop that drains the event queue.
//!
//! [`Arbiter`] owns the single lock around [`GameState`]. Both paths into
//! arbitration go through [`Arbiter::arbitrate`]: the queued path from
//! [`run_arbiter`], and the inline path from a submitter whose record the
//! queue refused. Notifications are broadcast while the write lock is
//! held, so subscribers receive them in the order the state changed; log
//! lines are written after the lock is released.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use buzzer_types::{EngineNotification, StatsSnapshot, Submission};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};

use crate::queue::QueueItem;
use crate::state::{ArbitrationPath, EpochSummary, GameState};

/// Game state behind one lock, plus the notification fan-out.
#[derive(Debug)]
pub struct Arbiter {
    state: RwLock<GameState>,
    notifications: broadcast::Sender<EngineNotification>,
}

impl Arbiter {
    /// Create an arbiter for a fresh epoch.
    pub fn new(notification_capacity: usize) -> Self {
        let (notifications, _) = broadcast::channel(notification_capacity.max(1));
        Self {
            state: RwLock::new(GameState::start_now()),
            notifications,
        }
    }

    // Every GameState mutation is a single method call; a poisoned lock
    // still holds a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, GameState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GameState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one record and claim the winner slot if it is the first
    /// correct record of the epoch. Returns `true` on a claim.
    pub fn arbitrate(&self, record: Submission, path: ArbitrationPath) -> bool {
        let mut state = self.write();
        let Some(claim) = state.arbitrate(record, path, Instant::now()) else {
            return false;
        };
        // Sent under the lock so subscribers see transitions in state order.
        let receivers = self.notify(EngineNotification::WinnerDeclared {
            epoch_id: claim.epoch_id,
            participant_id: claim.record.participant_id,
            answer: claim.record.answer.clone(),
            time_to_win_secs: claim.time_to_win_secs,
            total_responses: claim.total_count,
            correct_responses: claim.correct_count,
        });
        drop(state);

        info!(
            epoch = %claim.epoch_id,
            participant_id = claim.record.participant_id,
            answer = %claim.record.answer,
            time_to_win_secs = claim.time_to_win_secs,
            total_responses = claim.total_count,
            correct_responses = claim.correct_count,
            path = ?claim.path,
            receivers,
            "Winner found"
        );
        true
    }

    /// Close the current epoch and open a new one in a single step.
    pub fn reset(&self) -> EpochSummary {
        let mut state = self.write();
        let summary = state.reset(Instant::now(), Utc::now());
        let receivers = self.notify(EngineNotification::EpochReset {
            previous_epoch_id: summary.epoch_id,
            new_epoch_id: summary.new_epoch_id,
            previous_winner: summary.winner.as_ref().map(|w| w.participant_id),
            total_responses: summary.total_count,
            correct_responses: summary.correct_count,
        });
        drop(state);

        info!(
            previous_epoch = %summary.epoch_id,
            new_epoch = %summary.new_epoch_id,
            previous_winner = ?summary.winner.as_ref().map(|w| w.participant_id),
            total_responses = summary.total_count,
            correct_responses = summary.correct_count,
            inline_processed = summary.inline_count,
            success_rate = ?summary.correct_percentage(),
            receivers,
            "Game engine reset"
        );
        summary
    }

    // Non-blocking; having no subscribers is not an error.
    fn notify(&self, note: EngineNotification) -> usize {
        self.notifications.send(note).unwrap_or(0)
    }

    /// Consistent copy of the current epoch's readable state.
    pub fn snapshot(&self, queue_depth: u64) -> StatsSnapshot {
        self.read().snapshot(Instant::now(), queue_depth)
    }

    /// The current winner, if any.
    pub fn winner(&self) -> Option<Submission> {
        self.read().winner().cloned()
    }

    /// Whether `participant_id` holds the winner slot right now.
    pub fn is_winner(&self, participant_id: i64) -> bool {
        self.read().is_winner(participant_id)
    }

    /// Subscribe to winner and reset notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotification> {
        self.notifications.subscribe()
    }
}

/// Drain the queue in FIFO order until the stop signal is raised or every
/// producer is gone.
///
/// Items still queued when the stop signal wins are abandoned; the count
/// is logged.
pub(crate) async fn run_arbiter(
    arbiter: Arc<Arbiter>,
    mut rx: mpsc::Receiver<QueueItem>,
    mut stop: watch::Receiver<bool>,
) {
    info!("Arbitration loop started");
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => {
                break;
            }
            item = rx.recv() => {
                match item {
                    Some(QueueItem::Submission(record)) => {
                        arbiter.arbitrate(record, ArbitrationPath::Queued);
                        processed = processed.saturating_add(1);
                    }
                    Some(QueueItem::Barrier(ack)) => {
                        let _ = ack.send(());
                    }
                    None => break,
                }
            }
        }
    }

    rx.close();
    let abandoned = rx.len();
    if abandoned > 0 {
        warn!(abandoned, "Arbitration loop stopped with records still queued");
    }
    info!(processed, "Arbitration loop stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn answer(id: i64, correct: bool) -> Submission {
        Submission::new(id, if correct { "42" } else { "41" }, correct)
    }

    #[test]
    fn arbitrate_claims_once_and_notifies() {
        let arbiter = Arbiter::new(8);
        let mut rx = arbiter.subscribe();

        assert!(!arbiter.arbitrate(answer(1, false), ArbitrationPath::Queued));
        assert!(arbiter.arbitrate(answer(2, true), ArbitrationPath::Inline));
        assert!(!arbiter.arbitrate(answer(3, true), ArbitrationPath::Queued));

        assert!(arbiter.is_winner(2));
        assert!(matches!(
            rx.try_recv(),
            Ok(EngineNotification::WinnerDeclared { participant_id: 2, .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_returns_closed_epoch_and_notifies() {
        let arbiter = Arbiter::new(8);
        arbiter.arbitrate(answer(5, true), ArbitrationPath::Queued);
        let before = arbiter.snapshot(0).epoch_id;

        let mut rx = arbiter.subscribe();
        let summary = arbiter.reset();

        assert_eq!(summary.epoch_id, before);
        assert_eq!(summary.winner.map(|w| w.participant_id), Some(5));
        assert!(arbiter.winner().is_none());
        assert!(matches!(
            rx.try_recv(),
            Ok(EngineNotification::EpochReset { previous_winner: Some(5), total_responses: 1, .. })
        ));
    }

    #[test]
    fn send_without_subscribers_is_harmless() {
        let arbiter = Arbiter::new(1);
        assert!(arbiter.arbitrate(answer(1, true), ArbitrationPath::Queued));
        let summary = arbiter.reset();
        assert_eq!(summary.total_count, 1);
    }

    #[test]
    fn notifications_follow_state_order_under_contention() {
        let arbiter = Arc::new(Arbiter::new(4096));
        let mut rx = arbiter.subscribe();
        let mut epoch = arbiter.snapshot(0).epoch_id;

        let claimer = {
            let arbiter = Arc::clone(&arbiter);
            std::thread::spawn(move || {
                for id in 0..2000 {
                    arbiter.arbitrate(answer(id, true), ArbitrationPath::Inline);
                }
            })
        };
        for _ in 0..200 {
            arbiter.reset();
            std::thread::yield_now();
        }
        claimer.join().unwrap();

        let mut winners_in_epoch = 0;
        while let Ok(note) = rx.try_recv() {
            match note {
                EngineNotification::WinnerDeclared { epoch_id, .. } => {
                    assert_eq!(epoch_id, epoch);
                    winners_in_epoch += 1;
                    assert_eq!(winners_in_epoch, 1);
                }
                EngineNotification::EpochReset {
                    previous_epoch_id,
                    new_epoch_id,
                    previous_winner,
                    ..
                } => {
                    assert_eq!(previous_epoch_id, epoch);
                    assert_eq!(previous_winner.is_some(), winners_in_epoch == 1);
                    epoch = new_epoch_id;
                    winners_in_epoch = 0;
                }
            }
        }
        assert_eq!(epoch, arbiter.snapshot(0).epoch_id);
    }

    #[tokio::test]
    async fn loop_exits_when_producers_are_gone() {
        let arbiter = Arc::new(Arbiter::new(4));
        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);

        for id in 1..=3 {
            let _ = tx.send(QueueItem::Submission(answer(id, id == 2))).await;
        }
        drop(tx);

        run_arbiter(Arc::clone(&arbiter), rx, stop_rx).await;

        let snap = arbiter.snapshot(0);
        assert_eq!(snap.total_responses, 3);
        assert_eq!(snap.winner.map(|w| w.participant_id), Some(2));
    }

    #[tokio::test]
    async fn loop_exits_on_stop_signal() {
        let arbiter = Arc::new(Arbiter::new(4));
        let (_tx, rx) = mpsc::channel::<QueueItem>(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_arbiter(Arc::clone(&arbiter), rx, stop_rx));
        stop_tx.send_replace(true);
        assert!(handle.await.is_ok());
    }
}
