//! Game state for one epoch and the arbitration step that mutates it.
//!
//! [`GameState`] is plain data with no locking of its own. The engine
//! wraps it in a single lock so that every arbitration step, snapshot, and
//! reset is one indivisible operation. Keeping the counters and the
//! winner slot behind the same lock is what lets a reader never observe a
//! counter pair from one moment and a winner from another.
//!
//! # Invariants
//!
//! - A claimed winner is always a correct submission.
//! - The winner and the instant it was claimed are stored together, so one
//!   is never present without the other.
//! - `correct_count <= total_count`.
//! - The claim instant is never earlier than the epoch start (both come
//!   from the monotonic clock).

use std::time::Instant;

use buzzer_types::{EpochId, StatsSnapshot, Submission, WinnerSummary, correct_percentage};
use chrono::{DateTime, Utc};

/// How a submission reached the arbitration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationPath {
    /// Dequeued by the arbitration loop in FIFO order.
    Queued,
    /// Arbitrated on the submitter's own task because the queue was full
    /// (or already closed by shutdown).
    Inline,
}

/// Winner-slot state within an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No correct submission has been arbitrated yet.
    AwaitingWinner,
    /// The winner slot is taken; only a reset leaves this phase.
    WinnerClaimed,
}

/// The claimed winner together with the instant it was claimed.
#[derive(Debug, Clone)]
struct ClaimedWinner {
    record: Submission,
    found_at: Instant,
}

/// Details of a winner claim, returned so the caller can announce it
/// after releasing the lock.
#[derive(Debug, Clone, PartialEq)]
pub struct WinnerClaim {
    /// Epoch the claim belongs to.
    pub epoch_id: EpochId,
    /// The winning record.
    pub record: Submission,
    /// Seconds from epoch start to the claim.
    pub time_to_win_secs: f64,
    /// Total count including the winning record.
    pub total_count: u64,
    /// Correct count including the winning record.
    pub correct_count: u64,
    /// Path the winning record took.
    pub path: ArbitrationPath,
}

/// Summary of an epoch closed by [`GameState::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// The epoch that was closed.
    pub epoch_id: EpochId,
    /// The epoch that replaced it.
    pub new_epoch_id: EpochId,
    /// Winner of the closed epoch, if any.
    pub winner: Option<Submission>,
    /// Total responses of the closed epoch.
    pub total_count: u64,
    /// Correct responses of the closed epoch.
    pub correct_count: u64,
    /// Responses arbitrated inline in the closed epoch.
    pub inline_count: u64,
}

impl EpochSummary {
    /// Success rate of the closed epoch, absent if nothing was submitted.
    pub fn correct_percentage(&self) -> Option<f64> {
        correct_percentage(self.correct_count, self.total_count)
    }
}

/// Mutable state of the current epoch.
#[derive(Debug, Clone)]
pub struct GameState {
    epoch_id: EpochId,
    epoch_started: Instant,
    epoch_started_at: DateTime<Utc>,
    winner: Option<ClaimedWinner>,
    total_count: u64,
    correct_count: u64,
    inline_count: u64,
}

impl GameState {
    /// Start a fresh epoch at the given instants.
    pub fn new(started: Instant, started_at: DateTime<Utc>) -> Self {
        Self {
            epoch_id: EpochId::new(),
            epoch_started: started,
            epoch_started_at: started_at,
            winner: None,
            total_count: 0,
            correct_count: 0,
            inline_count: 0,
        }
    }

    /// Start a fresh epoch now.
    pub fn start_now() -> Self {
        Self::new(Instant::now(), Utc::now())
    }

    /// Apply one submission: count it and, if it is the first correct one
    /// this epoch, claim the winner slot with it.
    ///
    /// Returns the claim details when this record became the winner.
    pub fn arbitrate(
        &mut self,
        record: Submission,
        path: ArbitrationPath,
        now: Instant,
    ) -> Option<WinnerClaim> {
        self.total_count = self.total_count.saturating_add(1);
        if record.is_correct {
            self.correct_count = self.correct_count.saturating_add(1);
        }
        if path == ArbitrationPath::Inline {
            self.inline_count = self.inline_count.saturating_add(1);
        }

        if self.winner.is_some() || !record.is_correct {
            return None;
        }

        let found_at = now.max(self.epoch_started);
        let claim = WinnerClaim {
            epoch_id: self.epoch_id,
            record: record.clone(),
            time_to_win_secs: found_at.duration_since(self.epoch_started).as_secs_f64(),
            total_count: self.total_count,
            correct_count: self.correct_count,
            path,
        };
        self.winner = Some(ClaimedWinner { record, found_at });
        Some(claim)
    }

    /// Close the current epoch and start a new one at the given instants.
    ///
    /// Clears the winner, zeroes every counter, and mints a new epoch id.
    pub fn reset(&mut self, started: Instant, started_at: DateTime<Utc>) -> EpochSummary {
        let previous = std::mem::replace(self, Self::new(started, started_at));
        EpochSummary {
            epoch_id: previous.epoch_id,
            new_epoch_id: self.epoch_id,
            winner: previous.winner.map(|w| w.record),
            total_count: previous.total_count,
            correct_count: previous.correct_count,
            inline_count: previous.inline_count,
        }
    }

    /// Copy the readable fields into a snapshot.
    pub fn snapshot(&self, now: Instant, queue_depth: u64) -> StatsSnapshot {
        let winner = self.winner.as_ref().map(|w| WinnerSummary {
            participant_id: w.record.participant_id,
            answer: w.record.answer.clone(),
            submitted_at_ns: w.record.submitted_at_ns,
            time_to_win_secs: w.found_at.duration_since(self.epoch_started).as_secs_f64(),
        });
        StatsSnapshot {
            epoch_id: self.epoch_id,
            epoch_started_at: self.epoch_started_at,
            total_responses: self.total_count,
            correct_responses: self.correct_count,
            has_winner: winner.is_some(),
            winner,
            game_duration_secs: now.saturating_duration_since(self.epoch_started).as_secs_f64(),
            correct_percentage: correct_percentage(self.correct_count, self.total_count),
            inline_processed: self.inline_count,
            queue_depth,
        }
    }

    /// Current winner-slot phase.
    pub const fn phase(&self) -> Phase {
        if self.winner.is_some() {
            Phase::WinnerClaimed
        } else {
            Phase::AwaitingWinner
        }
    }

    /// The winning record, if claimed.
    pub fn winner(&self) -> Option<&Submission> {
        self.winner.as_ref().map(|w| &w.record)
    }

    /// Whether `participant_id` currently holds the winner slot.
    pub fn is_winner(&self, participant_id: i64) -> bool {
        self.winner()
            .is_some_and(|w| w.participant_id == participant_id)
    }

    /// Identifier of the current epoch.
    pub const fn epoch_id(&self) -> EpochId {
        self.epoch_id
    }

    /// Total submissions arbitrated this epoch.
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Correct submissions arbitrated this epoch.
    pub const fn correct_count(&self) -> u64 {
        self.correct_count
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn answer(id: i64, correct: bool) -> Submission {
        Submission::new(id, if correct { "42" } else { "41" }, correct)
    }

    #[test]
    fn fresh_state_awaits_winner() {
        let state = GameState::start_now();
        assert_eq!(state.phase(), Phase::AwaitingWinner);
        assert_eq!(state.total_count(), 0);
        assert!(state.winner().is_none());
    }

    #[test]
    fn first_correct_claims_winner() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());

        assert!(state.arbitrate(answer(1, false), ArbitrationPath::Queued, start).is_none());
        let claim = state.arbitrate(
            answer(2, true),
            ArbitrationPath::Queued,
            start + Duration::from_millis(250),
        );

        let claim = claim.map(|c| (c.record.participant_id, c.total_count, c.correct_count));
        assert_eq!(claim, Some((2, 2, 1)));
        assert_eq!(state.phase(), Phase::WinnerClaimed);
        assert!(state.is_winner(2));
        assert!(!state.is_winner(1));
    }

    #[test]
    fn later_correct_answers_are_counted_but_cannot_win() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());

        let first = state.arbitrate(answer(7, true), ArbitrationPath::Queued, start);
        let second = state.arbitrate(answer(8, true), ArbitrationPath::Inline, start);

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(state.total_count(), 2);
        assert_eq!(state.correct_count(), 2);
        assert!(state.is_winner(7));
    }

    #[test]
    fn incorrect_answers_never_win() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());
        for id in 0..10 {
            assert!(state.arbitrate(answer(id, false), ArbitrationPath::Queued, start).is_none());
        }
        assert_eq!(state.phase(), Phase::AwaitingWinner);
        assert_eq!(state.correct_count(), 0);
        assert_eq!(state.total_count(), 10);
    }

    #[test]
    fn time_to_win_measured_from_epoch_start() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());
        let claim = state.arbitrate(
            answer(1, true),
            ArbitrationPath::Queued,
            start + Duration::from_millis(1500),
        );
        let secs = claim.map_or(0.0, |c| c.time_to_win_secs);
        assert!((secs - 1.5).abs() < 1e-9);

        let snap = state.snapshot(start + Duration::from_secs(3), 0);
        let snap_secs = snap.winner.map_or(0.0, |w| w.time_to_win_secs);
        assert!((snap_secs - 1.5).abs() < 1e-9);
        assert!((snap.game_duration_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn inline_path_is_tallied() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());
        state.arbitrate(answer(1, false), ArbitrationPath::Inline, start);
        state.arbitrate(answer(2, false), ArbitrationPath::Queued, start);
        let snap = state.snapshot(start, 3);
        assert_eq!(snap.inline_processed, 1);
        assert_eq!(snap.queue_depth, 3);
    }

    #[test]
    fn snapshot_percentage_and_winner() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());
        for (id, correct) in [(1, false), (2, true), (3, false), (4, true), (5, false)] {
            state.arbitrate(answer(id, correct), ArbitrationPath::Queued, start);
        }
        let snap = state.snapshot(start, 0);
        assert_eq!(snap.total_responses, 5);
        assert_eq!(snap.correct_responses, 2);
        assert!(snap.has_winner);
        assert_eq!(snap.winner.as_ref().map(|w| w.participant_id), Some(2));
        let pct = snap.correct_percentage.unwrap_or(f64::NAN);
        assert!((pct - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_clears_everything_and_reports_closed_epoch() {
        let start = Instant::now();
        let started_at = Utc::now();
        let mut state = GameState::new(start, started_at);
        let old_epoch = state.epoch_id();
        state.arbitrate(answer(1, true), ArbitrationPath::Inline, start);
        state.arbitrate(answer(2, false), ArbitrationPath::Queued, start);
        let before = state.snapshot(start + Duration::from_secs(5), 0);
        assert!((before.game_duration_secs - 5.0).abs() < 1e-9);

        let restarted_at = started_at + chrono::TimeDelta::seconds(5);
        let summary = state.reset(start + Duration::from_secs(5), restarted_at);

        assert_eq!(summary.epoch_id, old_epoch);
        assert_eq!(summary.new_epoch_id, state.epoch_id());
        assert_ne!(summary.new_epoch_id, old_epoch);
        assert_eq!(summary.winner.map(|w| w.participant_id), Some(1));
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.inline_count, 1);

        let snap = state.snapshot(start + Duration::from_secs(5), 0);
        assert_eq!(snap.epoch_started_at, restarted_at);
        assert!(snap.epoch_started_at > before.epoch_started_at);
        assert!(snap.game_duration_secs.abs() < 1e-9);
        assert!(!snap.has_winner);
        assert_eq!(snap.total_responses, 0);
        assert_eq!(snap.correct_responses, 0);
        assert_eq!(snap.inline_processed, 0);
        assert!(snap.correct_percentage.is_none());
        assert_eq!(state.phase(), Phase::AwaitingWinner);
    }

    #[test]
    fn reset_restarts_winner_race() {
        let start = Instant::now();
        let mut state = GameState::new(start, Utc::now());
        state.arbitrate(answer(1, true), ArbitrationPath::Queued, start);
        state.reset(start, Utc::now());
        let claim = state.arbitrate(answer(9, true), ArbitrationPath::Queued, start);
        assert_eq!(claim.map(|c| c.record.participant_id), Some(9));
    }

    #[test]
    fn claim_before_epoch_start_is_clamped() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut state = GameState::new(start, Utc::now());
        let claim = state.arbitrate(answer(1, true), ArbitrationPath::Queued, Instant::now());
        assert!(claim.is_some_and(|c| c.time_to_win_secs.abs() < f64::EPSILON));
    }
}
