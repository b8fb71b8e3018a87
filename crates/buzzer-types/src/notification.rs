//! Notifications the engine pushes to live subscribers.
//!
//! Delivered over a broadcast channel; slow subscribers skip ahead rather
//! than holding back the arbitration loop.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EpochId;

/// A state transition worth announcing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EngineNotification {
    /// The winner slot was claimed for an epoch.
    WinnerDeclared {
        /// Epoch the winner belongs to.
        epoch_id: EpochId,
        /// Winning participant.
        participant_id: i64,
        /// Winning answer.
        answer: String,
        /// Seconds from epoch start to the claim.
        time_to_win_secs: f64,
        /// Total responses arbitrated when the winner was claimed.
        total_responses: u64,
        /// Correct responses arbitrated when the winner was claimed.
        correct_responses: u64,
    },
    /// An epoch was closed and a fresh one started.
    EpochReset {
        /// The epoch that was closed.
        previous_epoch_id: EpochId,
        /// The epoch that replaced it.
        new_epoch_id: EpochId,
        /// Winner of the closed epoch, if any.
        previous_winner: Option<i64>,
        /// Total responses of the closed epoch.
        total_responses: u64,
        /// Correct responses of the closed epoch.
        correct_responses: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_with_snake_case_type() {
        let note = EngineNotification::EpochReset {
            previous_epoch_id: EpochId::new(),
            new_epoch_id: EpochId::new(),
            previous_winner: Some(2),
            total_responses: 5,
            correct_responses: 2,
        };
        let value = serde_json::to_value(&note).unwrap_or_default();
        assert_eq!(value["type"], "epoch_reset");
        assert_eq!(value["previous_winner"], 2);
    }
}
