//! Answer vocabulary and submission construction.

use buzzer_types::Submission;
use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;

/// Answers a correct participant may give.
pub const CORRECT_ANSWERS: &[&str] = &["42", "correct", "true", "yes"];

/// Answers an incorrect participant may give.
pub const INCORRECT_ANSWERS: &[&str] = &["41", "wrong", "false", "no", "maybe", "unknown"];

/// Pick an answer text consistent with `is_correct`.
pub fn pick_answer<R: Rng + ?Sized>(is_correct: bool, rng: &mut R) -> &'static str {
    let pool = if is_correct {
        CORRECT_ANSWERS
    } else {
        INCORRECT_ANSWERS
    };
    pool.choose(rng).copied().unwrap_or("unknown")
}

/// Build a submission for `user_id`, stamped with the current time.
pub fn build_submission<R: Rng + ?Sized>(user_id: i64, is_correct: bool, rng: &mut R) -> Submission {
    let ns = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    Submission::new(user_id, pick_answer(is_correct, rng), is_correct).with_timestamp_ns(ns)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn answers_match_correctness() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(CORRECT_ANSWERS.contains(&pick_answer(true, &mut rng)));
            assert!(INCORRECT_ANSWERS.contains(&pick_answer(false, &mut rng)));
        }
    }

    #[test]
    fn built_submission_is_stamped() {
        let mut rng = SmallRng::seed_from_u64(1);
        let sub = build_submission(12, true, &mut rng);
        assert_eq!(sub.participant_id, 12);
        assert!(sub.is_correct);
        assert!(sub.has_timestamp());
        assert!(CORRECT_ANSWERS.contains(&sub.answer.as_str()));
    }
}
