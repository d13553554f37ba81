// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Replication of the `system_auth` keyspace.
//!
//! Roles live in `system_auth`. A role is only known to the datacenters that
//! hold a replica of it, so before the admin role is created or changed the
//! keyspace is replicated with `NetworkTopologyStrategy` to every datacenter of
//! every region, with at most three replicas per datacenter.

use crate::constants::{
    MAX_SYSTEM_AUTH_RF, REPLICATION_CLASS_NETWORK_TOPOLOGY, SYSTEM_AUTH_KEYSPACE,
};
use crate::cql::{CqlSession, Replication};
use crate::crd::{CassandraCluster, DC};
use crate::errors::CredentialError;
use crate::names;
use crate::prober::RegionProber;
use kube::ResourceExt;
use tracing::{debug, info};

fn failed(cluster_name: &str, reason: String) -> CredentialError {
    CredentialError::SystemAuthReplicationFailed {
        cluster: cluster_name.to_string(),
        reason,
    }
}

/// Datacenters of every region: local, then managed, then unmanaged.
///
/// Managed regions report their datacenters through their prober. An unmanaged
/// datacenter counts its declared replication factor as its replicas.
///
/// # Errors
///
/// Fails when a managed region cannot be queried or reports no datacenters.
pub async fn all_dcs<P: RegionProber>(
    prober: &P,
    cluster: &CassandraCluster,
) -> Result<Vec<DC>, CredentialError> {
    let namespace = cluster.namespace().unwrap_or_default();
    let cluster_name = cluster.name_any();
    let mut dcs = cluster.spec.dcs.clone();

    for region in &cluster.spec.external_regions.managed {
        let host = names::managed_region_prober_host(&cluster_name, &namespace, region);
        let remote = prober.region_dcs(&host).await.map_err(|e| {
            failed(
                &cluster_name,
                format!("can't get datacenters of region {host}: {e}"),
            )
        })?;
        if remote.is_empty() {
            return Err(failed(
                &cluster_name,
                format!("region {host} reports no datacenters"),
            ));
        }
        dcs.extend(remote);
    }

    dcs.extend(
        cluster
            .spec
            .external_regions
            .unmanaged
            .iter()
            .flat_map(|region| &region.dcs)
            .map(|dc| DC {
                name: dc.name.clone(),
                replicas: dc.rf,
            }),
    );
    Ok(dcs)
}

/// Replication options placing `min(replicas, 3)` replicas in every datacenter.
#[must_use]
pub fn desired_replication(dcs: &[DC]) -> Replication {
    let mut replication: Replication = dcs
        .iter()
        .map(|dc| {
            (
                dc.name.clone(),
                dc.replicas.min(MAX_SYSTEM_AUTH_RF).to_string(),
            )
        })
        .collect();
    replication.insert(
        "class".to_string(),
        REPLICATION_CLASS_NETWORK_TOPOLOGY.to_string(),
    );
    replication
}

/// Alter `system_auth` when its replication differs from `dcs`.
///
/// Returns `true` when the keyspace was altered.
///
/// # Errors
///
/// Fails when the keyspace is missing or either statement is rejected.
pub async fn reconcile_system_auth<T: CqlSession>(
    session: &T,
    cluster_name: &str,
    dcs: &[DC],
) -> Result<bool, CredentialError> {
    let current = session
        .keyspace_replication(SYSTEM_AUTH_KEYSPACE)
        .await
        .map_err(|e| failed(cluster_name, e.to_string()))?
        .ok_or_else(|| {
            failed(
                cluster_name,
                format!("keyspace {SYSTEM_AUTH_KEYSPACE} doesn't exist"),
            )
        })?;

    let desired = desired_replication(dcs);
    if current == desired {
        debug!(cluster = %cluster_name, "system_auth replication is up to date");
        return Ok(false);
    }

    info!(
        cluster = %cluster_name,
        replication = ?desired,
        "Updating system_auth replication"
    );
    session
        .alter_keyspace_replication(SYSTEM_AUTH_KEYSPACE, &desired)
        .await
        .map_err(|e| failed(cluster_name, e.to_string()))?;
    Ok(true)
}

#[cfg(test)]
#[path = "system_auth_tests.rs"]
mod system_auth_tests;
