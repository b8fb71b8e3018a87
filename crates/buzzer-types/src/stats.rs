//! Point-in-time statistics for one epoch.
//!
//! A [`StatsSnapshot`] is copied out of the engine under a single read of
//! the game state, so the counters, the winner, and the winner's timing
//! always belong to the same moment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EpochId;

/// The winning submission as reported in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WinnerSummary {
    /// Winning participant.
    pub participant_id: i64,
    /// The winning answer text.
    pub answer: String,
    /// Producer (or engine) timestamp of the winning submission, Unix ns.
    pub submitted_at_ns: i64,
    /// Seconds between epoch start and the moment the winner was claimed.
    pub time_to_win_secs: f64,
}

/// Consistent copy of the readable game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatsSnapshot {
    /// The epoch this snapshot belongs to.
    pub epoch_id: EpochId,
    /// When the epoch began.
    pub epoch_started_at: DateTime<Utc>,
    /// Submissions arbitrated this epoch.
    pub total_responses: u64,
    /// Correct submissions arbitrated this epoch.
    pub correct_responses: u64,
    /// Whether the winner slot is claimed.
    pub has_winner: bool,
    /// The winner, when claimed.
    pub winner: Option<WinnerSummary>,
    /// Seconds since the epoch began.
    pub game_duration_secs: f64,
    /// `correct / total * 100`, absent while nothing has been arbitrated.
    pub correct_percentage: Option<f64>,
    /// Submissions arbitrated inline because the queue was full.
    pub inline_processed: u64,
    /// Records waiting in the queue when the snapshot was taken.
    pub queue_depth: u64,
}

/// Percentage of correct responses, or `None` when `total` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn correct_percentage(correct: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| correct as f64 / total as f64 * 100.0)
}
