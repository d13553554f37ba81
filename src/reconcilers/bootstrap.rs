// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Region bootstrap decision.
//!
//! A region without an active admin secret has to pick the credential it seeds
//! the secret with. The built-in default is only safe for the very first region
//! of a brand-new cluster; any sign that the cluster already exists elsewhere (or
//! existed here before) means the operator-supplied credential is the one in use.
//!
//! Rules, in priority order:
//!
//! 1. Data volume claims exist locally → provided credential.
//! 2. An unmanaged external region is declared → provided credential.
//! 3. A managed external region reports itself ready → provided credential.
//! 4. Otherwise → default credential.
//!
//! Probe failures count as "not ready". Two regions bootstrapping at the same
//! time may both decide on the default; nothing arbitrates between them.

use crate::crd::{CassandraCluster, Region, RegionKind};
use crate::errors::StoreError;
use crate::metrics;
use crate::names;
use crate::prober::RegionProber;
use crate::store::ObjectStore;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Why a bootstrap decision was made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapReason {
    /// Local data volumes already exist.
    StorageExists,
    /// At least one unmanaged external region is declared.
    UnmanagedRegionDeclared,
    /// The managed region behind this prober host reported ready.
    ManagedRegionReady(String),
    /// No other region is known to be running.
    FreshCluster,
}

impl fmt::Display for BootstrapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageExists => {
                write!(f, "Persistent storage exists, using the provided admin credential")
            }
            Self::UnmanagedRegionDeclared => write!(
                f,
                "Unmanaged external regions are declared, using the provided admin credential"
            ),
            Self::ManagedRegionReady(host) => write!(
                f,
                "Region {host} is ready, joining it with the provided admin credential"
            ),
            Self::FreshCluster => write!(
                f,
                "No other region is running, bootstrapping with the default admin credential"
            ),
        }
    }
}

/// Credential to seed a new region with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapDecision {
    pub use_provided_credentials: bool,
    pub reason: BootstrapReason,
}

impl BootstrapDecision {
    fn provided(reason: BootstrapReason) -> Self {
        Self {
            use_provided_credentials: true,
            reason,
        }
    }

    fn default_credential() -> Self {
        Self {
            use_provided_credentials: false,
            reason: BootstrapReason::FreshCluster,
        }
    }
}

/// External regions of `cluster` in declaration order, managed first.
///
/// Managed regions are named after their prober host; unmanaged regions get a
/// synthetic `unmanaged-<index>` name.
#[must_use]
pub fn declared_regions(cluster: &CassandraCluster, namespace: &str) -> Vec<Region> {
    let cluster_name = cluster.name_any();
    let regions = &cluster.spec.external_regions;

    let managed = regions.managed.iter().map(|region| Region {
        name: names::managed_region_prober_host(&cluster_name, namespace, region),
        kind: RegionKind::Managed,
    });
    let unmanaged = (0..regions.unmanaged.len()).map(|i| Region {
        name: format!("unmanaged-{i}"),
        kind: RegionKind::Unmanaged,
    });
    managed.chain(unmanaged).collect()
}

/// Decide from already observed facts.
///
/// `ready` holds probe answers keyed by region name; missing entries are not ready.
#[must_use]
pub fn decide_from(
    storage_exists: bool,
    regions: &[Region],
    ready: &BTreeMap<String, bool>,
) -> BootstrapDecision {
    if storage_exists {
        return BootstrapDecision::provided(BootstrapReason::StorageExists);
    }
    if regions.iter().any(|r| r.kind == RegionKind::Unmanaged) {
        return BootstrapDecision::provided(BootstrapReason::UnmanagedRegionDeclared);
    }
    regions
        .iter()
        .filter(|r| r.kind == RegionKind::Managed)
        .find(|r| ready.get(&r.name).copied().unwrap_or(false))
        .map_or_else(BootstrapDecision::default_credential, |r| {
            BootstrapDecision::provided(BootstrapReason::ManagedRegionReady(r.name.clone()))
        })
}

/// Observe storage and remote regions, then decide.
///
/// Remote regions are only probed when neither local storage nor an unmanaged
/// region settles the decision, and probing stops at the first ready region.
///
/// # Errors
///
/// Returns an error if looking up the local volume claims fails. Probe errors are
/// logged and treated as "not ready".
pub async fn decide<S, P>(
    store: &S,
    prober: &P,
    cluster: &CassandraCluster,
) -> Result<BootstrapDecision, StoreError>
where
    S: ObjectStore,
    P: RegionProber,
{
    let namespace = cluster.namespace().unwrap_or_default();
    let cluster_name = cluster.name_any();
    let regions = declared_regions(cluster, &namespace);

    let storage_exists = storage_exists(store, cluster, &namespace).await?;
    let mut ready = BTreeMap::new();

    if !storage_exists && regions.iter().all(|r| r.kind == RegionKind::Managed) {
        for region in &regions {
            let is_ready = match prober.region_ready(&region.name).await {
                Ok(is_ready) => is_ready,
                Err(e) => {
                    warn!(
                        cluster = %cluster_name,
                        region = %region.name,
                        error = %e,
                        "Region readiness probe failed, treating region as not ready"
                    );
                    metrics::record_region_probe_failure(&region.name);
                    false
                }
            };
            debug!(cluster = %cluster_name, region = %region.name, ready = is_ready, "Probed region");
            ready.insert(region.name.clone(), is_ready);
            if is_ready {
                break;
            }
        }
    }

    let decision = decide_from(storage_exists, &regions, &ready);
    info!(
        cluster = %cluster_name,
        namespace = %namespace,
        use_provided_credentials = decision.use_provided_credentials,
        "{}",
        decision.reason
    );
    Ok(decision)
}

/// Whether the first data volume claim of any local DC exists.
async fn storage_exists<S: ObjectStore>(
    store: &S,
    cluster: &CassandraCluster,
    namespace: &str,
) -> Result<bool, StoreError> {
    let cluster_name = cluster.name_any();
    for dc in &cluster.spec.dcs {
        let claim = names::first_data_volume_claim(&cluster_name, &dc.name);
        if store
            .get::<PersistentVolumeClaim>(namespace, &claim)
            .await?
            .is_some()
        {
            debug!(cluster = %cluster_name, claim = %claim, "Found existing data volume claim");
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod bootstrap_tests;
