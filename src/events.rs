// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes events emitted against `CassandraCluster` resources.
//!
//! Events are an operational signal only. Publishing failures are logged and
//! never fail a reconciliation pass.

use crate::constants::CONTROLLER_NAME;
use crate::crd::CassandraCluster;
use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

// ============================================================================
// Event Reasons
// ============================================================================

/// A fresh active admin secret was written for a new region.
pub const REASON_ADMIN_SECRET_CREATED: &str = "AdminSecretCreated";

/// A new admin role was created in the database.
pub const REASON_ADMIN_ROLE_CREATED: &str = "AdminRoleCreated";

/// The active admin credential was rotated and committed.
pub const REASON_ADMIN_ROLE_CHANGED: &str = "AdminRoleChanged";

/// Rotation of the admin credential failed; the previous credential stays active.
pub const REASON_ADMIN_ROLE_UPDATE_FAILED: &str = "AdminRoleUpdateFailed";

/// The operator-supplied admin secret is missing.
pub const REASON_ADMIN_ROLE_SECRET_NOT_FOUND: &str = "AdminRoleSecretNotFound";

/// The operator-supplied admin secret is malformed.
pub const REASON_ADMIN_ROLE_SECRET_INVALID: &str = "AdminRoleSecretInvalid";

/// The cluster configuration exposes unencrypted traffic.
pub const REASON_INSECURE_SETUP: &str = "InsecureSetup";

/// The region decided how to bootstrap its admin credential.
pub const REASON_REGION_INIT: &str = "RegionInit";

/// Severity of a published event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// Sink for operational events about a cluster.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish an event. Implementations must swallow (and log) their own failures.
    async fn publish(
        &self,
        cluster: &CassandraCluster,
        severity: Severity,
        reason: &str,
        message: &str,
    );
}

/// [`EventSink`] backed by the `events.k8s.io` API.
#[derive(Clone)]
pub struct KubeEventSink {
    recorder: Recorder,
}

impl KubeEventSink {
    /// Create a sink reporting as the operator controller.
    #[must_use]
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn publish(
        &self,
        cluster: &CassandraCluster,
        severity: Severity,
        reason: &str,
        message: &str,
    ) {
        let event = Event {
            type_: match severity {
                Severity::Normal => EventType::Normal,
                Severity::Warning => EventType::Warning,
            },
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: "Reconcile".to_string(),
            secondary: None,
        };

        if let Err(e) = self
            .recorder
            .publish(&event, &cluster.object_ref(&()))
            .await
        {
            warn!(
                cluster = %cluster.name_any(),
                reason = reason,
                error = %e,
                "Failed to publish event"
            );
        }
    }
}
