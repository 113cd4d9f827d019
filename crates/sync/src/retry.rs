//! Retry timing for snapshot pulls and push reconnects

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delay schedule between attempts
///
/// Snapshot pulls use a fixed delay; the push connection uses exponential
/// backoff with jitter so that many consoles do not reconnect in lockstep
/// after a backend restart.
///
/// # Example
///
/// ```
/// use ballotflow_sync::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential()
///     .with_initial_interval(Duration::from_millis(500))
///     .with_max_interval(Duration::from_secs(30))
///     .with_jitter(0.0);
///
/// assert_eq!(policy.delay_for_retry(1), Duration::from_millis(500));
/// assert_eq!(policy.delay_for_retry(2), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first one; `None` retries forever
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Delay before the first retry
    #[serde(with = "duration_millis")]
    pub initial_interval: Duration,

    /// Upper bound for any single delay
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,

    /// Growth factor between consecutive delays (1.0 = fixed)
    pub backoff_coefficient: f64,

    /// Randomness applied to each delay, 0.0-1.0 (0.1 = ±10%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

impl RetryPolicy {
    /// Unbounded exponential backoff: 1s, 2s, 4s, ... capped at 30s, 10% jitter
    pub fn exponential() -> Self {
        Self {
            max_attempts: None,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            backoff_coefficient: 2.0,
            jitter: 0.1,
        }
    }

    /// Unbounded retries with the same delay every time
    pub fn fixed(interval: Duration) -> Self {
        Self {
            max_attempts: None,
            initial_interval: interval,
            max_interval: interval,
            backoff_coefficient: 1.0,
            jitter: 0.0,
        }
    }

    /// A single attempt, never retried
    pub fn no_retry() -> Self {
        Self::fixed(Duration::ZERO).with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `retry` (1 = first retry)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let base = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let capped = base.min(self.max_interval.as_secs_f64());

        let jittered = if self.jitter > 0.0 && capped > 0.0 {
            let spread = capped * self.jitter;
            let offset = rand::thread_rng().gen_range(-spread..spread);
            (capped + offset).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered)
    }

    /// Whether attempt number `attempt` (1-based) may still be made
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
