// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "cassandra", "reaper")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_OPERATOR: &str = "cassandra-operator";

/// Application name for every managed object
pub const APP_NAME_CASSANDRA: &str = "cassandra";

/// Component value for Cassandra nodes and their credentials
pub const COMPONENT_CASSANDRA: &str = "cassandra";

// ============================================================================
// Operator-Specific Annotations
// ============================================================================

/// Annotation placed on the operator-supplied admin secret naming the owning cluster
pub const CLUSTER_ANNOTATION: &str = "cassandra-operator.io/cluster";

/// Build the label set shared by all objects of one component of a cluster.
#[must_use]
pub fn component_labels(cluster_name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (K8S_NAME.to_string(), APP_NAME_CASSANDRA.to_string()),
        (K8S_INSTANCE.to_string(), cluster_name.to_string()),
        (K8S_COMPONENT.to_string(), component.to_string()),
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_OPERATOR.to_string()),
    ])
}
