//! Periodic live-stats reporting while a round is undecided.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::arbiter::Arbiter;
use crate::queue::EventQueue;

/// Log a stats line every `period` until the stop signal is raised.
///
/// Quiet while nothing has been submitted and once a winner is known.
pub(crate) async fn run_reporter(
    arbiter: Arc<Arbiter>,
    queue: EventQueue,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            _ = interval.tick() => {
                let depth = u64::try_from(queue.depth()).unwrap_or(u64::MAX);
                let snap = arbiter.snapshot(depth);
                if snap.total_responses > 0 && !snap.has_winner {
                    info!(
                        total = snap.total_responses,
                        correct = snap.correct_responses,
                        correct_pct = snap.correct_percentage.unwrap_or(0.0),
                        duration_secs = snap.game_duration_secs,
                        queue_depth = snap.queue_depth,
                        "Live stats"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use buzzer_types::Submission;

    use super::*;
    use crate::state::ArbitrationPath;

    #[tokio::test(start_paused = true)]
    async fn reporter_runs_until_stopped() {
        let arbiter = Arc::new(Arbiter::new(4));
        let (queue, _rx) = EventQueue::bounded(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        arbiter.arbitrate(Submission::new(1, "41", false), ArbitrationPath::Queued);

        let handle = tokio::spawn(run_reporter(
            Arc::clone(&arbiter),
            queue,
            Duration::from_millis(50),
            stop_rx,
        ));
        tokio::time::sleep(Duration::from_millis(175)).await;
        assert!(!handle.is_finished());

        stop_tx.send_replace(true);
        assert!(handle.await.is_ok());
    }
}
