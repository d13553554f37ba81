// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! [`OperatorConfig`] is parsed from command-line flags, each of which can also be
//! provided through an environment variable. Reconcilers only see [`Settings`],
//! the subset that shapes their behavior.

use crate::constants::{
    DEFAULT_CQL_CONNECT_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_VERIFY_ATTEMPTS, DEFAULT_VERIFY_INITIAL_DELAY_MILLIS, DEFAULT_VERIFY_MAX_DELAY_MILLIS,
    METRICS_SERVER_PORT,
};
use crate::prober::ProberAuth;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Command-line configuration of the operator binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "cassandra-operator", version, about = "Multi-region Cassandra operator")]
pub struct OperatorConfig {
    /// Namespace to watch. Watches all namespaces when unset.
    #[arg(long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Port of the Prometheus metrics endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Delay before re-running a pass that waits on a rollout
    #[arg(long, env = "RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    pub retry_delay_secs: u64,

    /// Login attempts when verifying a rotated admin credential
    #[arg(long, env = "VERIFY_ATTEMPTS", default_value_t = DEFAULT_VERIFY_ATTEMPTS)]
    pub verify_attempts: u32,

    /// First delay between login verification attempts
    #[arg(long, env = "VERIFY_INITIAL_DELAY_MS", default_value_t = DEFAULT_VERIFY_INITIAL_DELAY_MILLIS)]
    pub verify_initial_delay_ms: u64,

    /// Ceiling of the delay between login verification attempts
    #[arg(long, env = "VERIFY_MAX_DELAY_MS", default_value_t = DEFAULT_VERIFY_MAX_DELAY_MILLIS)]
    pub verify_max_delay_ms: u64,

    /// CQL connection timeout
    #[arg(long, env = "CQL_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CQL_CONNECT_TIMEOUT_SECS)]
    pub cql_connect_timeout_secs: u64,

    /// Timeout of remote region readiness probes
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value_t = DEFAULT_PROBE_TIMEOUT_SECS)]
    pub probe_timeout_secs: u64,

    /// Basic auth user presented to remote region probers
    #[arg(long, env = "PROBER_USER")]
    pub prober_user: Option<String>,

    /// Basic auth password presented to remote region probers
    #[arg(long, env = "PROBER_PASSWORD", hide_env_values = true)]
    pub prober_password: Option<String>,
}

impl OperatorConfig {
    /// Settings consumed by the reconcilers.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            verify_attempts: self.verify_attempts.max(1),
            verify_initial_delay: Duration::from_millis(self.verify_initial_delay_ms),
            verify_max_delay: Duration::from_millis(self.verify_max_delay_ms),
        }
    }

    /// Prober credentials, present only when both user and password are set.
    #[must_use]
    pub fn prober_auth(&self) -> Option<ProberAuth> {
        match (&self.prober_user, &self.prober_password) {
            (Some(user), Some(password)) => Some(ProberAuth {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn cql_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.cql_connect_timeout_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Timing knobs of a reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Delay returned with `RetryAfter` when a pass waits on a rollout
    pub retry_delay: Duration,
    /// Login attempts when verifying a rotated credential (at least 1)
    pub verify_attempts: u32,
    pub verify_initial_delay: Duration,
    pub verify_max_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            verify_attempts: DEFAULT_VERIFY_ATTEMPTS,
            verify_initial_delay: Duration::from_millis(DEFAULT_VERIFY_INITIAL_DELAY_MILLIS),
            verify_max_delay: Duration::from_millis(DEFAULT_VERIFY_MAX_DELAY_MILLIS),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
