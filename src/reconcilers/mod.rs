// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `CassandraCluster` resources.
//!
//! # Reconciliation Architecture
//!
//! Each pass runs the same ordered steps:
//!
//! 1. **Bootstrap** - For a region without an active admin credential, decide whether
//!    to seed it with the built-in default or the operator-supplied credential
//!    ([`bootstrap`])
//! 2. **Credentials** - Reconcile the active admin credential, rotating it in the
//!    database when the operator-supplied one changed ([`admin_auth`]). A rotation
//!    first replicates `system_auth` to every datacenter ([`system_auth`])
//! 3. **Derived secrets** - Write the auth config secret consumed by the pods
//!    ([`auth_config`])
//! 4. **Gate** - Hold the repair service rollout behind the first datacenter
//!    ([`readiness`])
//! 5. **Status** - Report the outcome on the resource ([`status`])
//!
//! Every object write goes through the generic convergence engine in [`converge`].
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use cassandra_operator::context::OperatorContext;
//! use cassandra_operator::crd::CassandraCluster;
//! use cassandra_operator::reconcilers::{reconcile_cassandracluster, Outcome};
//!
//! async fn run(ctx: &OperatorContext, cluster: &CassandraCluster) -> anyhow::Result<()> {
//!     match reconcile_cassandracluster(ctx, cluster).await? {
//!         Outcome::Done => println!("converged"),
//!         Outcome::RetryAfter(delay) => println!("retry in {delay:?}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod admin_auth;
pub mod auth_config;
pub mod bootstrap;
pub mod cassandracluster;
pub mod converge;
pub mod readiness;
pub mod retry;
pub mod status;
pub mod system_auth;

#[cfg(test)]
pub(crate) mod test_support;

pub use cassandracluster::reconcile_cassandracluster;
pub use converge::{converge, Convergence, ManagedResource};

use std::time::Duration;

/// Result of a reconciliation step that may need to wait on something external.
///
/// Failures are carried by the `Err` arm of the surrounding `Result`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to do in this pass.
    Done,
    /// Re-run the pass after the given delay.
    RetryAfter(Duration),
}

impl Outcome {
    /// Returns `true` when the pass has to be re-run later.
    #[must_use]
    pub fn is_retry(&self) -> bool {
        matches!(self, Outcome::RetryAfter(_))
    }
}
