// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic desired-state convergence for managed objects.
//!
//! [`converge`] makes one object in the store match its desired form:
//!
//! 1. Missing object: create it with the owner reference attached (`Created`).
//! 2. Present object: carry forward the fields the cluster owns (annotations added
//!    by others, allocated IPs, generated selectors), then compare.
//! 3. Equal: no write (`Unchanged`).
//! 4. Different and mutable: replace in place using the observed `resourceVersion`
//!    (`Updated`).
//! 5. Different and immutable: delete, then create (`Updated`). Between the two
//!    calls the object does not exist; readers must tolerate that gap.
//!
//! Errors are never retried here. A conflict means the pass worked from a stale
//! read and has to start over.
//!
//! Object kinds plug in through [`ManagedResource`].

use crate::errors::StoreError;
use crate::metrics;
use crate::store::{ObjectStore, StoreObject};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of converging one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convergence {
    Unchanged,
    Created,
    Updated,
}

/// Per-kind behavior the convergence engine needs.
pub trait ManagedResource: StoreObject {
    /// Immutable objects are replaced (delete + create), never edited in place.
    fn is_immutable(&self) -> bool {
        false
    }

    /// Copy fields owned by the cluster from `actual` into `self` (the desired object).
    fn carry_forward(&mut self, _actual: &Self) {}

    /// Whether the content of `actual` already matches `self`. Metadata is compared
    /// separately.
    fn content_matches(&self, actual: &Self) -> bool;
}

/// Make the object named by `desired` match it.
///
/// # Arguments
///
/// * `store` - Object store to read and write through
/// * `namespace` - Namespace of the object
/// * `desired` - Desired object; its name identifies the object
/// * `owner` - Owner reference attached to the object, if any
///
/// # Errors
///
/// Returns the first store error. When the error occurs between the delete and the
/// create of an immutable object, the object is absent until the next pass.
pub async fn converge<S, K>(
    store: &S,
    namespace: &str,
    mut desired: K,
    owner: Option<&OwnerReference>,
) -> Result<Convergence, StoreError>
where
    S: ObjectStore,
    K: ManagedResource,
{
    let kind = K::kind(&()).to_string();
    let name = desired.name_any();
    desired.meta_mut().namespace = Some(namespace.to_string());
    if let Some(owner) = owner {
        desired.meta_mut().owner_references = Some(vec![owner.clone()]);
    }

    let Some(actual) = store.get::<K>(namespace, &name).await? else {
        store.create(namespace, &desired).await?;
        info!(kind = %kind, namespace = %namespace, name = %name, "Created {kind} {namespace}/{name}");
        metrics::record_object_converged(&kind, "created");
        return Ok(Convergence::Created);
    };

    merge_metadata(&mut desired, &actual);
    desired.carry_forward(&actual);

    if metadata_matches(&desired, &actual) && desired.content_matches(&actual) {
        debug!(kind = %kind, namespace = %namespace, name = %name, "{kind} {namespace}/{name} is up to date");
        return Ok(Convergence::Unchanged);
    }

    if actual.is_immutable() || desired.is_immutable() {
        store.delete::<K>(namespace, &name).await?;
        desired.meta_mut().resource_version = None;
        store.create(namespace, &desired).await?;
        info!(kind = %kind, namespace = %namespace, name = %name, "Replaced immutable {kind} {namespace}/{name}");
        metrics::record_object_converged(&kind, "replaced");
        return Ok(Convergence::Updated);
    }

    desired
        .meta_mut()
        .resource_version
        .clone_from(&actual.meta().resource_version);
    store.update(namespace, &desired).await?;
    info!(kind = %kind, namespace = %namespace, name = %name, "Updated {kind} {namespace}/{name}");
    metrics::record_object_converged(&kind, "updated");
    Ok(Convergence::Updated)
}

/// Keep annotations set by others and, absent a desired owner, the existing owners.
fn merge_metadata<K: Resource>(desired: &mut K, actual: &K) {
    if let Some(existing) = &actual.meta().annotations {
        let annotations = desired
            .meta_mut()
            .annotations
            .get_or_insert_with(BTreeMap::new);
        for (k, v) in existing {
            annotations.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    if desired.meta().owner_references.is_none() {
        desired
            .meta_mut()
            .owner_references
            .clone_from(&actual.meta().owner_references);
    }
}

fn metadata_matches<K: Resource>(desired: &K, actual: &K) -> bool {
    let (d, a) = (desired.meta(), actual.meta());
    map_or_empty(&d.labels) == map_or_empty(&a.labels)
        && map_or_empty(&d.annotations) == map_or_empty(&a.annotations)
        && d.owner_references.clone().unwrap_or_default()
            == a.owner_references.clone().unwrap_or_default()
}

fn map_or_empty(map: &Option<BTreeMap<String, String>>) -> BTreeMap<String, String> {
    map.clone().unwrap_or_default()
}

/// `true` when every field set in `desired` has the same value in `actual`.
///
/// Objects match key by key, so fields the server defaults are ignored. Arrays
/// must have the same length and match element-wise. `null` in `desired` matches
/// anything.
#[must_use]
pub fn json_subset(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Null, _) => true,
        (Value::Object(d), Value::Object(a)) => d
            .iter()
            .all(|(k, v)| json_subset(v, a.get(k).unwrap_or(&Value::Null))),
        (Value::Array(d), Value::Array(a)) => {
            d.len() == a.len() && d.iter().zip(a).all(|(dv, av)| json_subset(dv, av))
        }
        (d, a) => d == a,
    }
}

fn spec_subset<T: Serialize>(desired: &Option<T>, actual: &Option<T>) -> bool {
    match (
        serde_json::to_value(desired).ok(),
        serde_json::to_value(actual).ok(),
    ) {
        (Some(d), Some(a)) => json_subset(&d, &a),
        _ => false,
    }
}

// ============================================================================
// Kinds
// ============================================================================

impl ManagedResource for Secret {
    fn is_immutable(&self) -> bool {
        self.immutable == Some(true)
    }

    fn content_matches(&self, actual: &Self) -> bool {
        self.data.clone().unwrap_or_default() == actual.data.clone().unwrap_or_default()
            && self.type_.as_deref().unwrap_or("Opaque") == actual.type_.as_deref().unwrap_or("Opaque")
            && self.is_immutable() == actual.is_immutable()
    }
}

impl ManagedResource for ConfigMap {
    fn is_immutable(&self) -> bool {
        self.immutable == Some(true)
    }

    fn content_matches(&self, actual: &Self) -> bool {
        self.data.clone().unwrap_or_default() == actual.data.clone().unwrap_or_default()
            && self.binary_data.clone().unwrap_or_default()
                == actual.binary_data.clone().unwrap_or_default()
            && self.is_immutable() == actual.is_immutable()
    }
}

impl ManagedResource for StatefulSet {
    fn carry_forward(&mut self, actual: &Self) {
        if let (Some(desired), Some(actual)) = (self.spec.as_mut(), actual.spec.as_ref()) {
            desired.selector = actual.selector.clone();
        }
    }

    fn content_matches(&self, actual: &Self) -> bool {
        spec_subset(&self.spec, &actual.spec)
    }
}

impl ManagedResource for Deployment {
    fn carry_forward(&mut self, actual: &Self) {
        if let (Some(desired), Some(actual)) = (self.spec.as_mut(), actual.spec.as_ref()) {
            desired.selector = actual.selector.clone();
        }
    }

    fn content_matches(&self, actual: &Self) -> bool {
        spec_subset(&self.spec, &actual.spec)
    }
}

impl ManagedResource for Service {
    fn carry_forward(&mut self, actual: &Self) {
        let (Some(desired), Some(actual)) = (self.spec.as_mut(), actual.spec.as_ref()) else {
            return;
        };

        desired.cluster_ip.clone_from(&actual.cluster_ip);
        desired.cluster_ips.clone_from(&actual.cluster_ips);
        desired.ip_families.clone_from(&actual.ip_families);

        let Some(actual_ports) = &actual.ports else {
            return;
        };
        for port in desired.ports.iter_mut().flatten() {
            if port.node_port.is_some() {
                continue;
            }
            port.node_port = actual_ports
                .iter()
                .find(|p| p.name == port.name && p.port == port.port)
                .and_then(|p| p.node_port);
        }
    }

    fn content_matches(&self, actual: &Self) -> bool {
        spec_subset(&self.spec, &actual.spec)
    }
}

#[cfg(test)]
#[path = "converge_tests.rs"]
mod converge_tests;
