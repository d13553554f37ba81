// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded retry with exponential backoff.
//!
//! Login verification after an admin credential change is the only wait a
//! reconciliation pass performs inline: the new credential has to propagate to
//! every node before it authenticates. Attempts are bounded by count, so a pass
//! never blocks longer than the sum of the configured delays.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with specified parameters.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval.min(max_interval),
            max_interval,
            multiplier,
            randomization_factor,
        }
    }

    /// Get the next backoff interval and grow the following one.
    pub fn next_backoff(&mut self) -> Duration {
        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        jittered
    }

    /// Apply randomization (jitter) to an interval.
    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 || interval.is_zero() {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff between login verification attempts.
///
/// # Retry Schedule
///
/// With the default settings (1s initial, 10s ceiling) attempts are spaced at
/// approximately 1s, 2s, 4s, 8s, then 10s.
#[must_use]
pub fn verification_backoff(initial: Duration, max: Duration) -> ExponentialBackoff {
    ExponentialBackoff::new(initial, max, BACKOFF_MULTIPLIER, RANDOMIZATION_FACTOR)
}

/// Run `operation` up to `max_attempts` times, sleeping between failures.
///
/// # Arguments
///
/// * `max_attempts` - Total number of attempts (values below 1 are treated as 1)
/// * `backoff` - Delay schedule between attempts
/// * `operation_name` - Human-readable name for logging (e.g., "verify login as admin")
/// * `operation` - Async function performing one attempt
///
/// # Errors
///
/// Returns the error of the last attempt once all attempts failed.
pub async fn retry_bounded<T, E, F, Fut>(
    max_attempts: u32,
    mut backoff: ExponentialBackoff,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                debug!(
                    operation = operation_name,
                    attempt = attempt,
                    "Operation succeeded"
                );
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    "Attempts exhausted, giving up"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = backoff.next_backoff();
                debug!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?delay,
                    error = %e,
                    "Attempt failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
