// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deterministic names of the objects derived from a `CassandraCluster`.

use crate::constants::CQL_PORT;
use crate::crd::ManagedRegion;

/// Immutable secret holding the credential currently valid against the live cluster.
#[must_use]
pub fn active_admin_secret(cluster_name: &str) -> String {
    format!("{cluster_name}-active-admin-secret")
}

/// Mutable secret with the files (cqlshrc, JMX) derived from the active credential.
#[must_use]
pub fn auth_config_secret(cluster_name: &str) -> String {
    format!("{cluster_name}-auth-config")
}

/// Workload (and headless service) running one local datacenter.
#[must_use]
pub fn dc(cluster_name: &str, dc_name: &str) -> String {
    format!("{cluster_name}-cassandra-{dc_name}")
}

/// Repair service deployment of one datacenter.
#[must_use]
pub fn reaper_deployment(cluster_name: &str, dc_name: &str) -> String {
    format!("{}-reaper", dc(cluster_name, dc_name))
}

/// Volume claim of the first pod of a datacenter; it exists once the DC ever started.
#[must_use]
pub fn first_data_volume_claim(cluster_name: &str, dc_name: &str) -> String {
    format!("data-{}-0", dc(cluster_name, dc_name))
}

/// CQL endpoint the operator connects to: the service of the first declared DC.
#[must_use]
pub fn cql_endpoint(cluster_name: &str, namespace: &str, first_dc: &str) -> String {
    format!(
        "{}.{namespace}.svc.cluster.local:{CQL_PORT}",
        dc(cluster_name, first_dc)
    )
}

/// Host of the prober ingress of a region.
#[must_use]
pub fn prober_host(cluster_name: &str, namespace: &str, domain: &str) -> String {
    format!("{cluster_name}-cassandra-prober-{namespace}.{domain}")
}

/// Host of the prober ingress of a managed external region.
///
/// The remote cluster carries the same name; its namespace defaults to ours.
#[must_use]
pub fn managed_region_prober_host(
    cluster_name: &str,
    local_namespace: &str,
    region: &ManagedRegion,
) -> String {
    let namespace = region.namespace.as_deref().unwrap_or(local_namespace);
    prober_host(cluster_name, namespace, &region.domain)
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod names_tests;
