// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Auth config secret mounted by the Cassandra pods.
//!
//! Derived from the committed active credential; it carries the cqlsh
//! configuration and, with JMX local-file authentication, the JMX password and
//! access files.

use super::admin_auth::Credential;
use super::converge::{converge, Convergence};
use crate::constants::{
    CQL_PORT, SECRET_KEY_ADMIN_PASSWORD, SECRET_KEY_ADMIN_ROLE, SECRET_KEY_CQLSHRC,
    SECRET_KEY_JMX_ACCESS_FILE, SECRET_KEY_JMX_PASSWORD_FILE, SECRET_TYPE_OPAQUE,
};
use crate::crd::{CassandraCluster, JmxAuthentication};
use crate::labels::{component_labels, COMPONENT_CASSANDRA};
use crate::names;
use crate::store::ObjectStore;
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// `cqlshrc` logging in as `credential` on the local node.
#[must_use]
pub fn cqlshrc(credential: &Credential) -> String {
    format!(
        "\n[authentication]\nusername = {}\npassword = {}\n[connection]\nhostname = 127.0.0.1\nport = {CQL_PORT}\n",
        credential.role, credential.password
    )
}

/// `jmxremote.password` granting `credential` access.
#[must_use]
pub fn jmx_password_file(credential: &Credential) -> String {
    format!("{} {}\n", credential.role, credential.password)
}

/// `jmxremote.access` giving the admin role read-write access.
#[must_use]
pub fn jmx_access_file(credential: &Credential) -> String {
    format!(
        "{} readwrite \\\ncreate javax.management.monitor.*, javax.management.timer.* \\\nunregister\n",
        credential.role
    )
}

/// Build the auth config secret for `credential`.
#[must_use]
pub fn auth_config_secret(cluster: &CassandraCluster, credential: &Credential) -> Secret {
    let cluster_name = cluster.name_any();
    let mut data: BTreeMap<String, ByteString> = BTreeMap::from([
        (SECRET_KEY_ADMIN_ROLE.to_string(), credential.role.clone()),
        (SECRET_KEY_ADMIN_PASSWORD.to_string(), credential.password.clone()),
        (SECRET_KEY_CQLSHRC.to_string(), cqlshrc(credential)),
    ])
    .into_iter()
    .map(|(k, v)| (k, ByteString(v.into_bytes())))
    .collect();

    if cluster.spec.jmx.authentication == JmxAuthentication::LocalFiles {
        data.insert(
            SECRET_KEY_JMX_PASSWORD_FILE.to_string(),
            ByteString(jmx_password_file(credential).into_bytes()),
        );
        data.insert(
            SECRET_KEY_JMX_ACCESS_FILE.to_string(),
            ByteString(jmx_access_file(credential).into_bytes()),
        );
    }

    Secret {
        metadata: ObjectMeta {
            name: Some(names::auth_config_secret(&cluster_name)),
            namespace: cluster.namespace(),
            labels: Some(component_labels(&cluster_name, COMPONENT_CASSANDRA)),
            ..ObjectMeta::default()
        },
        data: Some(data),
        type_: Some(SECRET_TYPE_OPAQUE.to_string()),
        ..Secret::default()
    }
}

/// Converge the auth config secret of `cluster` to `credential`.
///
/// # Errors
///
/// Returns an error if the secret cannot be read or written.
pub async fn reconcile_auth_config<S: ObjectStore>(
    store: &S,
    cluster: &CassandraCluster,
    credential: &Credential,
    owner: Option<&OwnerReference>,
) -> Result<Convergence> {
    let namespace = cluster.namespace().unwrap_or_default();
    let secret = auth_config_secret(cluster, credential);
    let name = secret.name_any();

    converge(store, &namespace, secret, owner)
        .await
        .with_context(|| format!("Failed to reconcile auth config secret {namespace}/{name}"))
}

#[cfg(test)]
#[path = "auth_config_tests.rs"]
mod auth_config_tests;
