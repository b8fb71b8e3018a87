//! The submission record and the acknowledgement returned to submitters.
//!
//! A [`Submission`] is immutable once created. It moves by value from the
//! producer into the engine queue and from there into the arbitration
//! loop; nothing downstream edits it. The one adjustment the engine makes
//! (assigning a timestamp when the producer left it out) goes through
//! [`Submission::stamped`], which consumes the record and returns a new one.
//!
//! The wire shape is the one the reference HTTP clients speak:
//!
//! ```json
//! {"user_id": 7, "answer": "42", "is_correct": true, "timestamp": 1700000000000000000}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One participant's answer.
///
/// Correctness is decided by the caller; the engine treats `answer` and
/// `participant_id` as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Submission {
    /// Caller-supplied participant identifier. Not required to be unique.
    #[serde(rename = "user_id")]
    pub participant_id: i64,
    /// The answer text, opaque to the engine.
    pub answer: String,
    /// Whether the caller judged this answer correct.
    pub is_correct: bool,
    /// Unix timestamp in nanoseconds. Zero or negative means the producer
    /// did not supply one.
    #[serde(rename = "timestamp", default)]
    pub submitted_at_ns: i64,
}

impl Submission {
    /// Create an unstamped submission.
    pub fn new(participant_id: i64, answer: impl Into<String>, is_correct: bool) -> Self {
        Self {
            participant_id,
            answer: answer.into(),
            is_correct,
            submitted_at_ns: 0,
        }
    }

    /// Builder-style setter for a producer-supplied timestamp.
    #[must_use]
    pub const fn with_timestamp_ns(mut self, submitted_at_ns: i64) -> Self {
        self.submitted_at_ns = submitted_at_ns;
        self
    }

    /// Whether the producer supplied a timestamp.
    pub const fn has_timestamp(&self) -> bool {
        self.submitted_at_ns > 0
    }

    /// Return this record with a timestamp, assigning `now` if the
    /// producer did not supply one. A producer timestamp is kept as-is.
    #[must_use]
    pub fn stamped(self, now: DateTime<Utc>) -> Self {
        if self.has_timestamp() {
            return self;
        }
        // Dates past 2262 do not fit in i64 nanoseconds.
        let ns = now.timestamp_nanos_opt().unwrap_or(i64::MAX);
        self.with_timestamp_ns(ns)
    }

    /// The submission time as a UTC datetime, if one is set.
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.has_timestamp()
            .then(|| DateTime::from_timestamp_nanos(self.submitted_at_ns))
    }
}

/// Acknowledgement returned by `POST /submit`.
///
/// `is_winner` reflects the winner slot right after the submission was
/// handed to the engine. A record still waiting in the queue is reported
/// as `false` even if it goes on to win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SubmitResponse {
    /// Always `true`: the submission was accepted (queued or arbitrated).
    pub received: bool,
    /// Echo of the submitted participant id.
    pub user_id: i64,
    /// Whether this participant currently holds the winner slot.
    pub is_winner: bool,
    /// Running count of submissions received by this server process.
    pub response_count: u64,
}
