// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Cassandra Operator - multi-region Cassandra clusters on Kubernetes
//!
//! The operator reconciles `CassandraCluster` resources. Each resource describes one
//! region of a (possibly multi-region) Cassandra cluster: its local datacenters,
//! the operator-supplied admin credential and the other regions it joins.
//!
//! ## Overview
//!
//! - Bootstrapping a region with the right admin credential, depending on whether
//!   the cluster already runs elsewhere
//! - Rotating the admin credential in the database without ever leaving the
//!   cluster without a working admin login
//! - Converging the Kubernetes objects derived from the credential
//! - Serializing the repair service rollout across datacenters
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - Reconciliation logic
//! - [`store`], [`cql`], [`prober`], [`events`] - External capabilities as traits
//! - [`context`] - Capability bundle handed to every pass
//! - [`config`] - Command-line and environment configuration
//! - [`errors`] - Typed errors
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use cassandra_operator::crd::{CassandraCluster, CassandraClusterSpec, DC};
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
//! let cluster = CassandraCluster::new("cc", spec);
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod cql;
pub mod crd;
pub mod errors;
pub mod events;
pub mod labels;
pub mod metrics;
pub mod names;
pub mod prober;
pub mod reconcilers;
pub mod status_reasons;
pub mod store;
