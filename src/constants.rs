// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Cassandra operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `CassandraCluster` CRD
pub const API_GROUP: &str = "db.cassandra-operator.io";

/// API version for the `CassandraCluster` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "db.cassandra-operator.io/v1alpha1";

/// Kind name for `CassandraCluster` resource
pub const KIND_CASSANDRA_CLUSTER: &str = "CassandraCluster";

/// Field manager / reporter name used for events
pub const CONTROLLER_NAME: &str = "cassandra-operator";

// ============================================================================
// Cassandra Protocol Constants
// ============================================================================

/// Native transport (CQL) port
pub const CQL_PORT: u16 = 9042;

/// Host port name that exposes CQL outside the pod network
pub const HOST_PORT_CQL: &str = "cql";

/// Keyspace holding roles and credentials
pub const SYSTEM_AUTH_KEYSPACE: &str = "system_auth";

/// Replication strategy class as reported by `system_schema.keyspaces`
pub const REPLICATION_CLASS_NETWORK_TOPOLOGY: &str =
    "org.apache.cassandra.locator.NetworkTopologyStrategy";

/// Upper bound of the `system_auth` replication factor in any datacenter
pub const MAX_SYSTEM_AUTH_RF: i32 = 3;

// ============================================================================
// Admin Credential Constants
// ============================================================================

/// Role every fresh Cassandra installation ships with
pub const CASSANDRA_DEFAULT_ROLE: &str = "cassandra";

/// Password of the built-in default role
pub const CASSANDRA_DEFAULT_PASSWORD: &str = "cassandra";

/// Secret key holding the admin role name
pub const SECRET_KEY_ADMIN_ROLE: &str = "admin-role";

/// Secret key holding the admin role password
pub const SECRET_KEY_ADMIN_PASSWORD: &str = "admin-password";

/// Secret key holding the JMX credentials blob (`username=...\npassword=...\n`)
pub const SECRET_KEY_JMX_CREDENTIALS: &str = "jmx";

/// Auth config secret key for the cqlsh configuration file
pub const SECRET_KEY_CQLSHRC: &str = "cqlshrc";

/// Auth config secret key for the JMX password file
pub const SECRET_KEY_JMX_PASSWORD_FILE: &str = "jmxremote.password";

/// Auth config secret key for the JMX access file
pub const SECRET_KEY_JMX_ACCESS_FILE: &str = "jmxremote.access";

/// Kubernetes secret type used for every secret the operator writes
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration after an optimistic-concurrency conflict (1 second)
pub const CONFLICT_REQUEUE_DURATION_SECS: u64 = 1;

/// Periodic resync once a pass has completed (5 minutes)
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

/// Default delay before re-running a deferred pass (10 seconds)
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Default number of login attempts when verifying a rotated credential
pub const DEFAULT_VERIFY_ATTEMPTS: u32 = 5;

/// Default first delay between login verification attempts
pub const DEFAULT_VERIFY_INITIAL_DELAY_MILLIS: u64 = 1000;

/// Default ceiling for the delay between login verification attempts
pub const DEFAULT_VERIFY_MAX_DELAY_MILLIS: u64 = 10_000;

/// Default CQL connect timeout
pub const DEFAULT_CQL_CONNECT_TIMEOUT_SECS: u64 = 6;

/// Default timeout for remote region readiness probes
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8329;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
