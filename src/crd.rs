// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for multi-region Cassandra clusters.
//!
//! The operator reconciles a single resource type, [`CassandraCluster`], which
//! declares the local datacenters, the operator-supplied admin credential, the
//! external regions that belong to the same logical cluster, and the security
//! features that shape the credential material the operator writes.
//!
//! # Example
//!
//! ```rust,no_run
//! use cassandra_operator::crd::{CassandraClusterSpec, DC};
//!
//! let spec = CassandraClusterSpec {
//!     dcs: vec![DC { name: "dc1".to_string(), replicas: 3 }],
//!     admin_role_secret_name: "admin-role".to_string(),
//!     external_regions: Default::default(),
//!     encryption: Default::default(),
//!     jmx: Default::default(),
//!     host_port: Default::default(),
//!     persistence: Default::default(),
//!     reaper: Default::default(),
//!     ingress: Default::default(),
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. The operator maintains a single `Ready` condition.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// A local Cassandra datacenter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DC {
    /// Datacenter name, unique within the cluster.
    #[schemars(length(min = 1))]
    pub name: String,

    /// Number of Cassandra nodes in this datacenter.
    #[schemars(range(min = 0))]
    pub replicas: i32,
}

/// Region whose operator exposes a prober this operator can query for readiness.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedRegion {
    /// Ingress domain of the remote region.
    pub domain: String,

    /// Namespace of the cluster in the remote region. Defaults to the local namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A datacenter in a region that is not managed by any operator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnmanagedDC {
    /// Datacenter name.
    pub name: String,

    /// Replication factor to use for this datacenter.
    pub rf: i32,
}

/// Pre-existing region assumed ready, never probed.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnmanagedRegion {
    /// Datacenters of the region.
    #[serde(default)]
    pub dcs: Vec<UnmanagedDC>,

    /// Seed addresses of the region.
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Other regions contributing replicas to the same logical cluster.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRegions {
    #[serde(default)]
    pub managed: Vec<ManagedRegion>,

    #[serde(default)]
    pub unmanaged: Vec<UnmanagedRegion>,
}

/// Whether the operator can probe a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Managed,
    Unmanaged,
}

/// A region of the logical cluster as seen by the bootstrap decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    /// Probe host for managed regions, a synthetic `unmanaged-<index>` name otherwise.
    pub name: String,
    pub kind: RegionKind,
}

impl ExternalRegions {
    /// Returns `true` when no other region is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managed.is_empty() && self.unmanaged.is_empty()
    }
}

/// Inter-node (server) encryption scope.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InternodeEncryption {
    #[default]
    None,
    All,
    Dc,
    Rack,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerEncryption {
    #[serde(default)]
    pub internode_encryption: InternodeEncryption,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientEncryption {
    #[serde(default)]
    pub enabled: bool,
}

/// Encryption settings for node-to-node and client-to-node traffic.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Encryption {
    #[serde(default)]
    pub server: ServerEncryption,

    #[serde(default)]
    pub client: ClientEncryption,
}

/// How JMX authenticates clients.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
pub enum JmxAuthentication {
    /// Cassandra internal authentication
    #[serde(rename = "internal")]
    Internal,
    /// `jmxremote.password` / `jmxremote.access` files mounted from the auth config secret
    #[default]
    #[serde(rename = "local_files")]
    LocalFiles,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Jmx {
    #[serde(default)]
    pub authentication: JmxAuthentication,
}

/// Exposes Cassandra ports on the host network for cross-region traffic.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostPort {
    #[serde(default)]
    pub enabled: bool,

    /// Named ports exposed on the host (e.g., `tls`, `cql`).
    #[serde(default)]
    pub ports: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    #[serde(default)]
    pub enabled: bool,
}

/// Repair service, rolled out one region at a time.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reaper {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    /// Ingress domain of this region.
    #[serde(default)]
    pub domain: String,
}

/// `CassandraCluster` declares one region of a (possibly multi-region) Cassandra cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "db.cassandra-operator.io",
    version = "v1alpha1",
    kind = "CassandraCluster",
    plural = "cassandraclusters",
    shortname = "cc",
    namespaced,
    doc = "CassandraCluster declares the local datacenters of a Cassandra cluster region, its admin credential and the external regions it joins."
)]
#[kube(status = "CassandraClusterStatus")]
#[kube(
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CassandraClusterSpec {
    /// Local datacenters, in initialization order.
    #[schemars(length(min = 1))]
    pub dcs: Vec<DC>,

    /// Secret holding the desired admin credential under `admin-role` and `admin-password`.
    #[schemars(length(min = 1))]
    pub admin_role_secret_name: String,

    #[serde(default)]
    pub external_regions: ExternalRegions,

    #[serde(default)]
    pub encryption: Encryption,

    #[serde(default)]
    pub jmx: Jmx,

    #[serde(default)]
    pub host_port: HostPort,

    #[serde(default)]
    pub persistence: Persistence,

    #[serde(default)]
    pub reaper: Reaper,

    #[serde(default)]
    pub ingress: Ingress,
}

/// `CassandraCluster` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CassandraClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Admin role committed in the active admin secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_admin_role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
