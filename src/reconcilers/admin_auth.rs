// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admin credential lifecycle.
//!
//! The operator keeps the credential it knows to authenticate against the live
//! cluster in an immutable secret, `<cluster>-active-admin-secret`. The
//! operator-supplied secret holds the desired credential. This module moves the
//! active credential toward the desired one without ever leaving the cluster
//! without a working admin login:
//!
//! ```text
//! NoCredential ──bootstrap──▶ Bootstrapped ──▶ Stable ⇄ RotationInFlight
//! ```
//!
//! - **Bootstrap**: with no active secret, seed it with either the built-in default
//!   or the desired credential (see [`bootstrap`](super::bootstrap)). The database
//!   is not contacted; it has not started yet.
//! - **Stable**: active equals desired, nothing to do.
//! - **Default guard**: rotating away from `cassandra/cassandra` waits until every
//!   local datacenter is fully ready, so the rotation cannot race the first boot.
//! - **Rotation**: log in as desired (another region may already have rotated);
//!   otherwise log in as active, replicate `system_auth` to every datacenter (see
//!   [`system_auth`](super::system_auth)), then set the password, creating the role
//!   first when it does not exist; verify the new login with bounded retries; only then replace the active secret.
//!
//! # Limitations
//!
//! When the role name changes the previous role is left in place. Dropping it is
//! a manual operation.

use super::bootstrap::{self, BootstrapDecision};
use super::converge::converge;
use super::retry::{retry_bounded, verification_backoff};
use super::system_auth;
use crate::constants::{
    CASSANDRA_DEFAULT_PASSWORD, CASSANDRA_DEFAULT_ROLE, SECRET_KEY_ADMIN_PASSWORD,
    SECRET_KEY_ADMIN_ROLE, SECRET_KEY_JMX_CREDENTIALS, SECRET_TYPE_OPAQUE,
};
use crate::context::Context;
use crate::cql::{CqlConnector, CqlSession, RoleOptions};
use crate::crd::{CassandraCluster, JmxAuthentication, DC};
use crate::errors::{CqlError, CredentialError};
use crate::events::{
    EventSink, Severity, REASON_ADMIN_ROLE_CHANGED, REASON_ADMIN_ROLE_CREATED,
    REASON_ADMIN_ROLE_UPDATE_FAILED, REASON_ADMIN_SECRET_CREATED, REASON_REGION_INIT,
};
use crate::labels::{component_labels, COMPONENT_CASSANDRA};
use crate::metrics;
use crate::names;
use crate::prober::RegionProber;
use crate::store::ObjectStore;
use anyhow::{Context as _, Result};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An admin role and its password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub role: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("role", &self.role)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credential {
    #[must_use]
    pub fn new(role: &str, password: &str) -> Self {
        Self {
            role: role.to_string(),
            password: password.to_string(),
        }
    }

    /// The role every fresh Cassandra installation ships with.
    #[must_use]
    pub fn default_admin() -> Self {
        Self::new(CASSANDRA_DEFAULT_ROLE, CASSANDRA_DEFAULT_PASSWORD)
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.role == CASSANDRA_DEFAULT_ROLE && self.password == CASSANDRA_DEFAULT_PASSWORD
    }

    /// Read a credential from the `admin-role` / `admin-password` keys of a secret.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when a key is missing, empty or not UTF-8.
    pub fn from_secret(secret: &Secret) -> Result<Self, String> {
        let role = secret_value(secret, SECRET_KEY_ADMIN_ROLE)?;
        let password = secret_value(secret, SECRET_KEY_ADMIN_PASSWORD)?;
        Ok(Self { role, password })
    }
}

fn secret_value(secret: &Secret, key: &str) -> Result<String, String> {
    let value = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|bytes| String::from_utf8(bytes.0.clone()))
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key))
                .map(|s| Ok(s.clone()))
        })
        .ok_or_else(|| format!("key '{key}' is missing"))?
        .map_err(|_| format!("key '{key}' is not valid UTF-8"))?;

    if value.is_empty() {
        return Err(format!("key '{key}' is empty"));
    }
    Ok(value)
}

/// JMX credentials blob mounted by the pods when JMX uses local files.
#[must_use]
pub fn jmx_credentials(credential: &Credential) -> String {
    format!(
        "username={}\npassword={}\n",
        credential.role, credential.password
    )
}

/// Build the immutable active admin secret holding `credential`.
#[must_use]
pub fn active_admin_secret(cluster: &CassandraCluster, credential: &Credential) -> Secret {
    let cluster_name = cluster.name_any();
    let mut data = BTreeMap::from([
        (
            SECRET_KEY_ADMIN_ROLE.to_string(),
            ByteString(credential.role.as_bytes().to_vec()),
        ),
        (
            SECRET_KEY_ADMIN_PASSWORD.to_string(),
            ByteString(credential.password.as_bytes().to_vec()),
        ),
    ]);
    if cluster.spec.jmx.authentication == JmxAuthentication::LocalFiles {
        data.insert(
            SECRET_KEY_JMX_CREDENTIALS.to_string(),
            ByteString(jmx_credentials(credential).into_bytes()),
        );
    }

    Secret {
        metadata: ObjectMeta {
            name: Some(names::active_admin_secret(&cluster_name)),
            namespace: cluster.namespace(),
            labels: Some(component_labels(&cluster_name, COMPONENT_CASSANDRA)),
            ..ObjectMeta::default()
        },
        data: Some(data),
        immutable: Some(true),
        type_: Some(SECRET_TYPE_OPAQUE.to_string()),
        ..Secret::default()
    }
}

/// Where the credential lifecycle stands after a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialState {
    /// The active secret was seeded; the database was not contacted.
    Bootstrapped(BootstrapDecision),
    /// Active already equals desired (or both are the default).
    Stable,
    /// The desired credential was verified and committed.
    Rotated,
    /// Rotation has to wait; re-run the pass after the delay.
    Deferred { after: Duration, message: String },
}

/// Active credential and lifecycle state after a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminAuth {
    pub active: Credential,
    pub state: CredentialState,
}

/// Reconcile the active admin credential of `cluster` toward `desired`.
///
/// # Errors
///
/// Returns an error if a store operation fails or the rotation cannot complete. The
/// previously committed active secret is left untouched in every error case.
pub async fn reconcile_admin_auth<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    desired: &Credential,
) -> Result<AdminAuth>
where
    S: ObjectStore,
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    let namespace = cluster.namespace().unwrap_or_default();
    let cluster_name = cluster.name_any();
    let secret_name = names::active_admin_secret(&cluster_name);

    let Some(actual) = ctx
        .store
        .get::<Secret>(&namespace, &secret_name)
        .await
        .with_context(|| format!("Failed to read active admin secret {namespace}/{secret_name}"))?
    else {
        info!(
            cluster = %cluster_name,
            namespace = %namespace,
            "Active admin secret {secret_name} doesn't exist. Assuming it's the first deployment of this region"
        );
        return bootstrap_active_secret(ctx, cluster, desired).await;
    };

    let active =
        Credential::from_secret(&actual).map_err(|reason| CredentialError::ActiveSecretInvalid {
            namespace: namespace.clone(),
            name: secret_name.clone(),
            reason,
        })?;

    if active == *desired {
        // Heals derived keys (e.g. the JMX blob) without touching the credential.
        converge(
            &ctx.store,
            &namespace,
            active_admin_secret(cluster, &active),
            active_secret_owner(cluster).as_ref(),
        )
        .await
        .with_context(|| format!("Failed to reconcile active admin secret {namespace}/{secret_name}"))?;

        debug!(cluster = %cluster_name, role = %active.role, "Admin credential is up to date");
        return Ok(AdminAuth {
            active,
            state: CredentialState::Stable,
        });
    }

    if active.is_default() {
        if let Some(message) = first_unready_dc(ctx, cluster).await? {
            info!(
                cluster = %cluster_name,
                "Deferring rotation of the default admin role: {message}"
            );
            return Ok(AdminAuth {
                active,
                state: CredentialState::Deferred {
                    after: ctx.settings.retry_delay,
                    message,
                },
            });
        }
    }

    let result = rotate(ctx, cluster, &active, desired).await;
    if let Err(e) = &result {
        metrics::record_credential_rotation("failed");
        ctx.events
            .publish(
                cluster,
                Severity::Warning,
                REASON_ADMIN_ROLE_UPDATE_FAILED,
                &format!("{e:#}"),
            )
            .await;
    }
    result
}

/// Owner of the active secret: the cluster, unless data outlives it.
fn active_secret_owner(
    cluster: &CassandraCluster,
) -> Option<k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference> {
    if cluster.spec.persistence.enabled {
        None
    } else {
        cluster.controller_owner_ref(&())
    }
}

async fn bootstrap_active_secret<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    desired: &Credential,
) -> Result<AdminAuth>
where
    S: ObjectStore,
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    let namespace = cluster.namespace().unwrap_or_default();
    let decision = bootstrap::decide(&ctx.store, &ctx.prober, cluster)
        .await
        .context("Failed to decide how to bootstrap the admin credential")?;

    let active = if decision.use_provided_credentials {
        desired.clone()
    } else {
        Credential::default_admin()
    };

    converge(
        &ctx.store,
        &namespace,
        active_admin_secret(cluster, &active),
        active_secret_owner(cluster).as_ref(),
    )
    .await
    .with_context(|| {
        format!(
            "Failed to create active admin secret {namespace}/{}",
            names::active_admin_secret(&cluster.name_any())
        )
    })?;

    info!(
        cluster = %cluster.name_any(),
        role = %active.role,
        reason = ?decision.reason,
        "Seeded active admin secret"
    );
    ctx.events
        .publish(
            cluster,
            Severity::Normal,
            REASON_REGION_INIT,
            &decision.reason.to_string(),
        )
        .await;
    ctx.events
        .publish(
            cluster,
            Severity::Normal,
            REASON_ADMIN_SECRET_CREATED,
            &format!("Active admin secret created for role '{}'", active.role),
        )
        .await;

    Ok(AdminAuth {
        active,
        state: CredentialState::Bootstrapped(decision),
    })
}

/// Describe the first local DC whose workload is not fully ready, if any.
async fn first_unready_dc<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
) -> Result<Option<String>>
where
    S: ObjectStore,
{
    let namespace = cluster.namespace().unwrap_or_default();
    let cluster_name = cluster.name_any();

    for dc in &cluster.spec.dcs {
        let name = names::dc(&cluster_name, &dc.name);
        let sts = ctx
            .store
            .get::<StatefulSet>(&namespace, &name)
            .await
            .with_context(|| format!("Failed to read StatefulSet {namespace}/{name}"))?;
        let ready = sts
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);

        if sts.is_none() || ready < dc.replicas {
            return Ok(Some(format!(
                "waiting for datacenter {} to become ready ({ready}/{})",
                dc.name, dc.replicas
            )));
        }
    }
    Ok(None)
}

async fn rotate<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    active: &Credential,
    desired: &Credential,
) -> Result<AdminAuth>
where
    S: ObjectStore,
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    let namespace = cluster.namespace().unwrap_or_default();
    let cluster_name = cluster.name_any();
    let endpoint = cluster_endpoint(cluster);

    info!(
        cluster = %cluster_name,
        active_role = %active.role,
        desired_role = %desired.role,
        "Admin credential changed, rotating"
    );

    match ctx
        .cql
        .open(&endpoint, &desired.role, &desired.password)
        .await
    {
        Ok(session) => {
            session.close().await;
            info!(
                cluster = %cluster_name,
                role = %desired.role,
                "Desired admin credential already authenticates, another region completed the rotation"
            );
        }
        Err(e) => {
            debug!(cluster = %cluster_name, error = %e, "Desired admin credential not accepted yet");
            apply_role_change(ctx, cluster, &endpoint, active, desired).await?;
        }
    }

    verify_login(ctx, cluster, &endpoint, desired).await?;

    converge(
        &ctx.store,
        &namespace,
        active_admin_secret(cluster, desired),
        active_secret_owner(cluster).as_ref(),
    )
    .await
    .with_context(|| {
        format!(
            "Failed to commit active admin secret {namespace}/{}",
            names::active_admin_secret(&cluster_name)
        )
    })?;

    info!(cluster = %cluster_name, role = %desired.role, "Committed rotated admin credential");
    metrics::record_credential_rotation("committed");
    ctx.events
        .publish(
            cluster,
            Severity::Normal,
            REASON_ADMIN_ROLE_CHANGED,
            &format!("Admin role changed to '{}'", desired.role),
        )
        .await;

    Ok(AdminAuth {
        active: desired.clone(),
        state: CredentialState::Rotated,
    })
}

/// Log in as the active credential, replicate `system_auth` and install the desired
/// credential in the database.
async fn apply_role_change<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    endpoint: &str,
    active: &Credential,
    desired: &Credential,
) -> Result<(), CredentialError>
where
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    let cluster_name = cluster.name_any();
    let dcs = system_auth::all_dcs(&ctx.prober, cluster).await?;

    let session = ctx
        .cql
        .open(endpoint, &active.role, &active.password)
        .await
        .map_err(|source| CredentialError::ActiveCredentialRejected {
            cluster: cluster_name.clone(),
            role: active.role.clone(),
            source,
        })?;

    let result = change_role(&session, &cluster_name, &dcs, active, desired).await;
    session.close().await;

    if result? {
        ctx.events
            .publish(
                cluster,
                Severity::Normal,
                REASON_ADMIN_ROLE_CREATED,
                &format!("Admin role '{}' is created", desired.role),
            )
            .await;
    }
    Ok(())
}

/// Set the desired password, creating the role first when it does not exist.
///
/// Returns `true` when the role was created.
async fn change_role<T: CqlSession>(
    session: &T,
    cluster_name: &str,
    dcs: &[DC],
    active: &Credential,
    desired: &Credential,
) -> Result<bool, CredentialError> {
    system_auth::reconcile_system_auth(session, cluster_name, dcs).await?;

    let mutation_failed = |source: CqlError| CredentialError::RoleMutationFailed {
        cluster: cluster_name.to_string(),
        role: desired.role.clone(),
        source,
    };

    let create = active.role != desired.role
        && !session
            .role_exists(&desired.role)
            .await
            .map_err(mutation_failed)?;

    if create {
        info!(
            cluster = %cluster_name,
            role = %desired.role,
            previous_role = %active.role,
            "Creating admin role. The previous role is kept and must be dropped manually"
        );
        session
            .create_role(&desired.role, &desired.password, RoleOptions::ADMIN)
            .await
            .map_err(mutation_failed)?;
        return Ok(true);
    }

    // Also reached for a role kept by an earlier rotation, whose password is stale.
    info!(cluster = %cluster_name, role = %desired.role, "Updating admin role password");
    session
        .update_role_password(&desired.role, &desired.password)
        .await
        .map_err(mutation_failed)?;
    Ok(false)
}

/// Log in as `desired`, tolerating propagation delay across the cluster.
async fn verify_login<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    endpoint: &str,
    desired: &Credential,
) -> Result<(), CredentialError>
where
    C: CqlConnector,
{
    let attempts = ctx.settings.verify_attempts;
    let backoff = verification_backoff(
        ctx.settings.verify_initial_delay,
        ctx.settings.verify_max_delay,
    );
    let operation = format!("verify login as {}", desired.role);

    let cql = &ctx.cql;
    let session = retry_bounded(attempts, backoff, &operation, move || {
        cql.open(endpoint, &desired.role, &desired.password)
    })
    .await
    .map_err(|source: CqlError| {
        warn!(
            cluster = %cluster.name_any(),
            role = %desired.role,
            attempts = attempts,
            "Login verification failed"
        );
        CredentialError::VerificationFailed {
            cluster: cluster.name_any(),
            role: desired.role.clone(),
            attempts: attempts.max(1),
            source,
        }
    })?;

    session.close().await;
    info!(cluster = %cluster.name_any(), role = %desired.role, "Logged in successfully with the new admin credential");
    Ok(())
}

/// CQL endpoint of the first local datacenter.
fn cluster_endpoint(cluster: &CassandraCluster) -> String {
    let first_dc = cluster
        .spec
        .dcs
        .first()
        .map(|dc| dc.name.as_str())
        .unwrap_or_default();
    names::cql_endpoint(
        &cluster.name_any(),
        &cluster.namespace().unwrap_or_default(),
        first_dc,
    )
}

#[cfg(test)]
#[path = "admin_auth_tests.rs"]
mod admin_auth_tests;
