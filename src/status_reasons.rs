// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `CassandraCluster` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why the single
//! `type: Ready` condition has its current status.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   activeAdminRole: admin
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: CredentialRotationPending
//!       message: "Waiting for datacenter dc1 to become ready (1/3) before rotating the default admin role"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// The encompassing condition type maintained on every `CassandraCluster`.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status values.
pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// Ready Reasons
// ============================================================================

/// The pass completed: credentials are committed and every gate is open.
pub const REASON_RECONCILED: &str = "Reconciled";

/// A fresh active admin secret was seeded; the database was not contacted.
pub const REASON_CREDENTIAL_BOOTSTRAPPED: &str = "CredentialBootstrapped";

/// Rotation away from the default credential waits for every local DC to become ready.
pub const REASON_CREDENTIAL_ROTATION_PENDING: &str = "CredentialRotationPending";

/// The dependent repair service waits for the first datacenter's rollout.
pub const REASON_REAPER_ROLLOUT_PENDING: &str = "ReaperRolloutPending";

// ============================================================================
// Failure Reasons
// ============================================================================

/// The operator-supplied admin secret does not exist.
pub const REASON_ADMIN_SECRET_NOT_FOUND: &str = "AdminSecretNotFound";

/// The operator-supplied admin secret is missing a key or cannot be decoded.
pub const REASON_ADMIN_SECRET_INVALID: &str = "AdminSecretInvalid";

/// The rotation failed; the previously committed credential is still active.
pub const REASON_CREDENTIAL_ROTATION_FAILED: &str = "CredentialRotationFailed";

/// Spec validation failed.
pub const REASON_CONFIGURATION_INVALID: &str = "ConfigurationInvalid";

/// Reading or writing a managed object failed.
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
