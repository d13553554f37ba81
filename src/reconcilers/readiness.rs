// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Serialized rollout of the repair service across datacenters.
//!
//! The repair service migrates its schema on first start. Rolling it out in
//! several datacenters at once races those migrations, so the first declared DC
//! must have its repair deployment ready before the others proceed. Only the
//! first DC is ever inspected.

use crate::crd::CassandraCluster;
use crate::errors::StoreError;
use crate::names;
use crate::store::ObjectStore;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use std::time::Duration;
use tracing::{debug, info};

/// Observed readiness of a dependent workload in one region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RolloutGateState {
    pub name: String,
    pub ready_replicas: i32,
    pub required_replicas: i32,
}

impl RolloutGateState {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready_replicas >= self.required_replicas
    }
}

/// Whether the rollout may go on past the first region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    DeferAfter(Duration),
}

/// Gate `ordered` regions on the first one.
///
/// `observe` is called for the first region only.
pub fn proceed<F>(ordered: &[String], mut observe: F, delay: Duration) -> GateDecision
where
    F: FnMut(&str) -> RolloutGateState,
{
    let Some(first) = ordered.first() else {
        return GateDecision::Continue;
    };

    let state = observe(first);
    if state.is_ready() {
        GateDecision::Continue
    } else {
        info!(
            workload = %state.name,
            ready = state.ready_replicas,
            required = state.required_replicas,
            "Waiting for {} to be ready before rolling out the other regions",
            state.name
        );
        GateDecision::DeferAfter(delay)
    }
}

/// Gate the repair service rollout of `cluster` on its first DC.
///
/// A missing deployment counts as 0 of 1 ready replicas.
///
/// # Errors
///
/// Returns an error if reading the deployment fails.
pub async fn reaper_gate<S: ObjectStore>(
    store: &S,
    cluster: &CassandraCluster,
    delay: Duration,
) -> Result<GateDecision, StoreError> {
    let namespace = cluster.namespace().unwrap_or_default();
    let cluster_name = cluster.name_any();
    let ordered: Vec<String> = cluster.spec.dcs.iter().map(|dc| dc.name.clone()).collect();

    let Some(first) = ordered.first() else {
        return Ok(GateDecision::Continue);
    };
    let name = names::reaper_deployment(&cluster_name, first);
    let deployment = store.get::<Deployment>(&namespace, &name).await?;

    let state = RolloutGateState {
        name: name.clone(),
        ready_replicas: deployment
            .as_ref()
            .and_then(|d| d.status.as_ref())
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0),
        required_replicas: deployment
            .as_ref()
            .and_then(|d| d.spec.as_ref())
            .and_then(|s| s.replicas)
            .unwrap_or(1),
    };
    debug!(cluster = %cluster_name, namespace = %namespace, ?state, "Observed repair service rollout");

    Ok(proceed(&ordered, |_| state.clone(), delay))
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod readiness_tests;
