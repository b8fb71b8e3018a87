//! Synthetic participants for exercising the buzzer HTTP API.
//!
//! [`LoadGenerator`] spawns one task per simulated participant; each
//! waits a random delay, picks a correct or incorrect answer, and posts
//! a single submission to `/submit`. The run ends with a [`LoadReport`].
//!
//! # Modules
//!
//! - [`answers`] -- Answer vocabulary and submission construction.
//! - [`generator`] -- Run configuration, per-participant plans, and the
//!   concurrent driver.

pub mod answers;
pub mod generator;

pub use answers::{CORRECT_ANSWERS, INCORRECT_ANSWERS, build_submission};
pub use generator::{LoadConfig, LoadError, LoadGenerator, LoadReport, UserPlan};
