// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Cassandra operator.
//!
//! This module provides specialized error types for:
//! - Object store (Kubernetes API) operations, with optimistic-concurrency conflicts
//!   distinguished from other failures
//! - CQL sessions used to mutate and verify admin roles
//! - Remote region readiness probes
//! - The admin credential lifecycle
//!
//! Every variant names the object and the operation that failed so the error is
//! actionable when it surfaces in the controller logs.

use thiserror::Error;

/// Errors returned by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The write raced with another writer (HTTP 409). Retried by re-running the pass.
    #[error("Conflict while trying to {operation} {kind} {namespace}/{name}; a fresh read is required")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        operation: &'static str,
    },

    /// The store refused the write (e.g. an in-place edit of an immutable object).
    #[error("{kind} {namespace}/{name} rejected the {operation}: {reason}")]
    Rejected {
        kind: String,
        namespace: String,
        name: String,
        operation: &'static str,
        reason: String,
    },

    /// Any other API failure (network, authorization, server errors).
    #[error("Failed to {operation} {kind} {namespace}/{name}: {source}")]
    Api {
        kind: String,
        namespace: String,
        name: String,
        operation: &'static str,
        #[source]
        source: kube::Error,
    },

    /// The object could not be converted to or from its wire representation.
    #[error("Failed to encode {kind} {namespace}/{name}: {reason}")]
    Encoding {
        kind: String,
        namespace: String,
        name: String,
        reason: String,
    },
}

impl StoreError {
    /// Returns `true` for optimistic-concurrency conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Errors returned by a [`CqlConnector`](crate::cql::CqlConnector) or its sessions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CqlError {
    /// No session could be opened with the given role. Expected while a rotation propagates.
    #[error("Unable to open CQL session on {endpoint} as role '{role}': {reason}")]
    Connect {
        endpoint: String,
        role: String,
        reason: String,
    },

    /// A statement was rejected by the cluster.
    #[error("CQL statement '{statement}' failed on {endpoint}: {reason}")]
    Statement {
        endpoint: String,
        statement: String,
        reason: String,
    },
}

/// Errors returned by a [`RegionProber`](crate::prober::RegionProber).
///
/// Probe failures are never fatal; callers downgrade them to "not ready".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Region readiness request to {host} failed: {reason}")]
    Request { host: String, reason: String },

    #[error("Region readiness request to {host} returned HTTP {status}")]
    Status { host: String, status: u16 },

    #[error("Unexpected region readiness response from {host}: '{body}' (expected true or false)")]
    Body { host: String, body: String },

    #[error("Unexpected datacenter list from {host}: {reason}")]
    Decode { host: String, reason: String },
}

/// Errors of the admin credential lifecycle.
///
/// None of these leave a partially committed credential behind: the active admin
/// secret is only replaced after a successful login with the new credential.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The operator-supplied admin secret does not exist. Retrying cannot fix a missing input.
    #[error("Admin role secret {namespace}/{name} not found")]
    AdminSecretNotFound { namespace: String, name: String },

    /// The operator-supplied admin secret lacks a required key or holds invalid UTF-8.
    #[error("Admin role secret {namespace}/{name} is invalid: {reason}")]
    AdminSecretInvalid {
        namespace: String,
        name: String,
        reason: String,
    },

    /// The active admin secret exists but cannot be decoded.
    #[error("Active admin secret {namespace}/{name} is invalid: {reason}")]
    ActiveSecretInvalid {
        namespace: String,
        name: String,
        reason: String,
    },

    /// Neither the desired nor the active credential authenticates; rotation cannot proceed.
    #[error("Cannot rotate admin credential of cluster {cluster}: active role '{role}' was rejected: {source}")]
    ActiveCredentialRejected {
        cluster: String,
        role: String,
        #[source]
        source: CqlError,
    },

    /// Creating the new role or changing the password failed.
    #[error("Failed to apply admin role '{role}' for cluster {cluster}: {source}")]
    RoleMutationFailed {
        cluster: String,
        role: String,
        #[source]
        source: CqlError,
    },

    /// `system_auth` could not be replicated to every datacenter before a role change.
    #[error("Failed to replicate system_auth for cluster {cluster}: {reason}")]
    SystemAuthReplicationFailed { cluster: String, reason: String },

    /// The new credential never authenticated within the retry budget.
    #[error("Couldn't log in as '{role}' on cluster {cluster} after {attempts} attempts. Either the role change failed or the cluster didn't propagate it in a timely manner: {source}")]
    VerificationFailed {
        cluster: String,
        role: String,
        attempts: u32,
        #[source]
        source: CqlError,
    },
}

/// Invalid `CassandraCluster` specification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CassandraCluster {namespace}/{name} declares no datacenters")]
    NoDatacenters { namespace: String, name: String },

    #[error("CassandraCluster has no namespace")]
    MissingNamespace,
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
