// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `CassandraCluster` resources.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (always `Ready` here)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase, see [`crate::status_reasons`])
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed

use crate::crd::{CassandraCluster, CassandraClusterStatus, Condition};
use crate::errors::StoreError;
use crate::status_reasons::CONDITION_TYPE_READY;
use crate::store::ObjectStore;
use chrono::Utc;
use kube::ResourceExt;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Arguments
///
/// * `condition_type` - The type of condition (e.g., "Ready")
/// * `status` - The status: "True", "False", or "Unknown"
/// * `reason` - A programmatic identifier in `CamelCase`
/// * `message` - A human-readable explanation
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// Preserves the `lastTransitionTime` if the status hasn't changed.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr| {
            curr.r#type == new_cond.r#type
                && curr.status == new_cond.status
                && curr.reason == new_cond.reason
                && curr.message == new_cond.message
        })
    })
}

/// Collects status changes during a pass and writes them in a single patch.
///
/// Writing once at the end keeps a pass from triggering itself through a
/// stream of intermediate status updates. Nothing is written when the
/// collected status equals the current one.
pub struct ClusterStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<CassandraClusterStatus>,
    new_status: CassandraClusterStatus,
}

impl ClusterStatusUpdater {
    #[must_use]
    pub fn new(cluster: &CassandraCluster) -> Self {
        let current_status = cluster.status.clone();
        let mut new_status = current_status.clone().unwrap_or_default();
        new_status.observed_generation = cluster.metadata.generation;

        Self {
            namespace: cluster.namespace().unwrap_or_default(),
            name: cluster.name_any(),
            current_status,
            new_status,
        }
    }

    /// Set the `Ready` condition.
    pub fn set_ready(&mut self, status: &str, reason: &str, message: &str) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            CONDITION_TYPE_READY,
            status,
            reason,
            message,
        );
    }

    /// Record the admin role committed in the active admin secret.
    pub fn set_active_admin_role(&mut self, role: &str) {
        self.new_status.active_admin_role = Some(role.to_string());
    }

    /// Returns `true` if the collected status differs from the current one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.active_admin_role != self.new_status.active_admin_role
                    || current.observed_generation != self.new_status.observed_generation
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    /// The status that [`apply`](Self::apply) writes.
    #[must_use]
    pub fn status(&self) -> &CassandraClusterStatus {
        &self.new_status
    }

    /// Write the collected status if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the status patch fails.
    pub async fn apply<S: ObjectStore>(&self, store: &S) -> Result<(), StoreError> {
        if !self.has_changes() {
            debug!(
                "Status of CassandraCluster {}/{} unchanged, skipping patch",
                self.namespace, self.name
            );
            return Ok(());
        }

        store
            .patch_cluster_status(&self.namespace, &self.name, &self.new_status)
            .await
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
