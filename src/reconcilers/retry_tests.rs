// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{retry_bounded, verification_backoff, ExponentialBackoff};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn no_delay() -> ExponentialBackoff {
        ExponentialBackoff::new(Duration::ZERO, Duration::ZERO, 2.0, 0.0)
    }

    /// Test that backoff configuration has expected values
    #[test]
    fn test_verification_backoff_configuration() {
        let backoff = verification_backoff(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(backoff.current_interval, Duration::from_secs(1));
        assert_eq!(backoff.max_interval, Duration::from_secs(10));

        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    /// Test that intervals double without jitter
    #[test]
    fn test_backoff_timing_progression() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(30), 2.0, 0.0);

        assert_eq!(backoff.next_backoff(), Duration::from_millis(100));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(200));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(400));
    }

    /// Test that max interval is respected
    #[test]
    fn test_max_interval_capping() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(10), 2.0, 0.0);

        for _ in 0..10 {
            backoff.next_backoff();
        }

        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
    }

    /// Test that an initial interval above the ceiling is capped
    #[test]
    fn test_initial_interval_capped() {
        let backoff =
            ExponentialBackoff::new(Duration::from_secs(60), Duration::from_secs(10), 2.0, 0.0);
        assert_eq!(backoff.current_interval, Duration::from_secs(10));
    }

    /// Test that jitter stays within ±10%
    #[test]
    fn test_jitter_bounds() {
        for _ in 0..50 {
            let mut backoff = verification_backoff(Duration::from_secs(1), Duration::from_secs(10));
            let delay = backoff.next_backoff();
            assert!(delay >= Duration::from_millis(900) && delay <= Duration::from_millis(1100));
        }
    }

    #[tokio::test]
    async fn test_retry_bounded_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<u32, String> = retry_bounded(5, no_delay(), "flaky", || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("attempt {n} failed"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_bounded_returns_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), String> = retry_bounded(4, no_delay(), "always fails", || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("attempt {n} failed"))
        })
        .await;

        assert_eq!(result, Err("attempt 4 failed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_bounded_zero_attempts_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), String> = retry_bounded(0, no_delay(), "once", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("nope".to_string())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
