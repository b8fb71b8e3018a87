//! Concurrent simulated participants posting to `/submit`.
//!
//! Every participant runs as its own task: it waits a random delay,
//! decides whether it knows the answer, and posts one submission. A
//! failed request is counted and logged; it never aborts the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use buzzer_core::config::LoadgenSettings;
use buzzer_types::{SubmitResponse, Submission};
use futures::future::join_all;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::answers::build_submission;

/// Errors raised by the load generator.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request failed before a response arrived, or the reply body
    /// could not be decoded.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),
}

/// Parameters of one load run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    /// Number of simulated participants, with ids `1..=users`.
    pub users: u32,
    /// Probability that a participant answers correctly.
    pub correct_probability: f64,
    /// Shortest delay before a participant submits.
    pub min_delay: Duration,
    /// Longest delay before a participant submits.
    pub max_delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::from(&LoadgenSettings::default())
    }
}

impl From<&LoadgenSettings> for LoadConfig {
    fn from(settings: &LoadgenSettings) -> Self {
        Self {
            users: settings.users,
            correct_probability: settings.correct_probability,
            min_delay: Duration::from_millis(settings.min_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
        }
    }
}

/// What one simulated participant will do.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPlan {
    /// How long to wait before submitting.
    pub delay: Duration,
    /// The record to submit.
    pub submission: Submission,
}

impl LoadConfig {
    /// Draw a plan for `user_id`.
    pub fn plan<R: Rng + ?Sized>(&self, user_id: i64, rng: &mut R) -> UserPlan {
        let probability = self.correct_probability.clamp(0.0, 1.0);
        let is_correct = rng.random_bool(probability);

        let min = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX).max(min);
        let delay = Duration::from_millis(rng.random_range(min..=max));

        UserPlan {
            delay,
            submission: build_submission(user_id, is_correct, rng),
        }
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Participants simulated.
    pub users: u32,
    /// Submissions acknowledged by the server.
    pub sent: u32,
    /// Submissions that failed.
    pub failed: u32,
    /// Acknowledgements that reported `is_winner: true`.
    pub winners_reported: u32,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

/// Drives simulated participants against one `/submit` URL.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    client: reqwest::Client,
    url: Arc<str>,
    config: LoadConfig,
}

impl LoadGenerator {
    /// Create a generator posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Client`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, config: LoadConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LoadError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: Arc::from(url.into()),
            config,
        })
    }

    /// The run parameters.
    pub const fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Simulate every participant concurrently and wait for all of them.
    pub async fn run(&self) -> LoadReport {
        let started = Instant::now();
        info!(users = self.config.users, url = %self.url, "Starting simulation");

        // ThreadRng is not Send; draw every plan before spawning.
        let plans: Vec<UserPlan> = {
            let mut rng = rand::rng();
            (1..=i64::from(self.config.users))
                .map(|id| self.config.plan(id, &mut rng))
                .collect()
        };

        let tasks = plans.into_iter().map(|plan| {
            let generator = self.clone();
            tokio::spawn(async move { generator.simulate(plan).await })
        });

        let mut report = LoadReport {
            users: self.config.users,
            ..LoadReport::default()
        };
        for outcome in join_all(tasks).await {
            match outcome {
                Ok(Ok(ack)) => {
                    report.sent = report.sent.saturating_add(1);
                    if ack.is_winner {
                        report.winners_reported = report.winners_reported.saturating_add(1);
                    }
                }
                Ok(Err(_)) => report.failed = report.failed.saturating_add(1),
                Err(e) => {
                    warn!(error = %e, "Participant task ended abnormally");
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }
        report.elapsed = started.elapsed();

        info!(
            users = report.users,
            sent = report.sent,
            failed = report.failed,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Simulation finished"
        );
        report
    }

    async fn simulate(&self, plan: UserPlan) -> Result<SubmitResponse, LoadError> {
        tokio::time::sleep(plan.delay).await;
        let user_id = plan.submission.participant_id;
        let result = self.send(&plan.submission).await;
        match &result {
            Ok(ack) => debug!(user_id, is_winner = ack.is_winner, "Submission acknowledged"),
            Err(e) => warn!(user_id, error = %e, "Failed to send response"),
        }
        result
    }

    /// Post one submission and decode the acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Http`] on transport or decode failure and
    /// [`LoadError::Status`] on a non-success reply.
    pub async fn send(&self, submission: &Submission) -> Result<SubmitResponse, LoadError> {
        let response = self
            .client
            .post(self.url.as_ref())
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        response
            .json::<SubmitResponse>()
            .await
            .map_err(LoadError::from)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn config(probability: f64) -> LoadConfig {
        LoadConfig {
            users: 10,
            correct_probability: probability,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn plan_delay_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(42);
        let cfg = config(0.3);
        for id in 1..=200 {
            let plan = cfg.plan(id, &mut rng);
            assert!(plan.delay >= cfg.min_delay);
            assert!(plan.delay <= cfg.max_delay);
            assert_eq!(plan.submission.participant_id, id);
        }
    }

    #[test]
    fn probability_extremes_are_deterministic() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert!((1..=50).all(|id| config(1.0).plan(id, &mut rng).submission.is_correct));
        assert!((1..=50).all(|id| !config(0.0).plan(id, &mut rng).submission.is_correct));
    }

    #[test]
    fn inverted_delay_bounds_collapse_to_min() {
        let mut rng = SmallRng::seed_from_u64(9);
        let cfg = LoadConfig {
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(5),
            ..config(0.5)
        };
        assert_eq!(cfg.plan(1, &mut rng).delay, Duration::from_millis(50));
    }

    #[test]
    fn config_from_settings() {
        let cfg = LoadConfig::default();
        assert_eq!(cfg.users, 1000);
        assert_eq!(cfg.min_delay, Duration::from_millis(10));
        assert_eq!(cfg.max_delay, Duration::from_millis(1000));
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }
}
