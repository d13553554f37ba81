// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CassandraCluster` reconciliation pass.
//!
//! One pass validates the resource, loads the operator-supplied admin credential,
//! reconciles the active credential, writes the auth config secret derived from
//! it, gates the repair service rollout and finally reports the outcome in the
//! `Ready` condition. The credential is committed before anything consuming it
//! is written.

use super::admin_auth::{reconcile_admin_auth, Credential, CredentialState};
use super::auth_config::reconcile_auth_config;
use super::readiness::{reaper_gate, GateDecision};
use super::status::ClusterStatusUpdater;
use super::Outcome;
use crate::constants::HOST_PORT_CQL;
use crate::context::Context;
use crate::cql::CqlConnector;
use crate::crd::{CassandraCluster, InternodeEncryption};
use crate::errors::{ConfigError, CredentialError};
use crate::events::{
    EventSink, Severity, REASON_ADMIN_ROLE_SECRET_INVALID, REASON_ADMIN_ROLE_SECRET_NOT_FOUND,
    REASON_INSECURE_SETUP,
};
use crate::labels::CLUSTER_ANNOTATION;
use crate::prober::RegionProber;
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, REASON_ADMIN_SECRET_INVALID,
    REASON_ADMIN_SECRET_NOT_FOUND, REASON_CONFIGURATION_INVALID, REASON_CREDENTIAL_BOOTSTRAPPED,
    REASON_CREDENTIAL_ROTATION_FAILED, REASON_CREDENTIAL_ROTATION_PENDING, REASON_RECONCILED,
    REASON_REAPER_ROLLOUT_PENDING, REASON_RECONCILE_FAILED,
};
use crate::store::ObjectStore;
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

/// Reconcile one `CassandraCluster`.
///
/// # Returns
///
/// * `Ok(Outcome::Done)` - Everything converged
/// * `Ok(Outcome::RetryAfter(delay))` - Waiting on a rollout outside this pass
///
/// # Errors
///
/// Returns an error when the resource is invalid, the admin secret is missing or
/// malformed, a store operation fails, or the credential rotation fails. The
/// `Ready` condition is set to `False` with the matching reason before returning.
pub async fn reconcile_cassandracluster<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
) -> Result<Outcome>
where
    S: ObjectStore,
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    let mut status = ClusterStatusUpdater::new(cluster);
    let result = reconcile_pass(ctx, cluster, &mut status).await;

    if let Err(e) = &result {
        let reason = failure_reason(e);
        status.set_ready(CONDITION_STATUS_FALSE, reason, &format!("{e:#}"));
    }
    if let Err(e) = status.apply(&ctx.store).await {
        // The pass error, if any, is the more useful one to surface.
        if result.is_ok() {
            return Err(e).context("Failed to update CassandraCluster status");
        }
        warn!(
            cluster = %cluster.name_any(),
            error = %e,
            "Failed to record failure in CassandraCluster status"
        );
    }
    result
}

async fn reconcile_pass<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    status: &mut ClusterStatusUpdater,
) -> Result<Outcome>
where
    S: ObjectStore,
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    let namespace = validate(cluster)?;
    let cluster_name = cluster.name_any();
    info!(cluster = %cluster_name, namespace = %namespace, "Reconciling CassandraCluster");

    warn_insecure_setup(ctx, cluster).await;

    let desired = load_desired_credential(ctx, cluster, &namespace).await?;

    let auth = reconcile_admin_auth(ctx, cluster, &desired).await?;
    if let CredentialState::Deferred { after, message } = &auth.state {
        status.set_ready(
            CONDITION_STATUS_FALSE,
            REASON_CREDENTIAL_ROTATION_PENDING,
            message,
        );
        return Ok(Outcome::RetryAfter(*after));
    }

    reconcile_auth_config(
        &ctx.store,
        cluster,
        &auth.active,
        cluster.controller_owner_ref(&()).as_ref(),
    )
    .await?;

    if cluster.spec.reaper.enabled {
        if let GateDecision::DeferAfter(delay) =
            reaper_gate(&ctx.store, cluster, ctx.settings.retry_delay)
                .await
                .context("Failed to check repair service rollout")?
        {
            status.set_ready(
                CONDITION_STATUS_FALSE,
                REASON_REAPER_ROLLOUT_PENDING,
                "Waiting for the repair service of the first datacenter to become ready",
            );
            return Ok(Outcome::RetryAfter(delay));
        }
    }

    let (reason, message) = match &auth.state {
        CredentialState::Bootstrapped(decision) => {
            (REASON_CREDENTIAL_BOOTSTRAPPED, decision.reason.to_string())
        }
        _ => (
            REASON_RECONCILED,
            format!("Admin role '{}' is active", auth.active.role),
        ),
    };
    status.set_ready(CONDITION_STATUS_TRUE, reason, &message);
    status.set_active_admin_role(&auth.active.role);

    debug!(cluster = %cluster_name, "CassandraCluster reconciled");
    Ok(Outcome::Done)
}

/// Check the resource and return its namespace.
fn validate(cluster: &CassandraCluster) -> Result<String, ConfigError> {
    let namespace = cluster.namespace().ok_or(ConfigError::MissingNamespace)?;
    if cluster.spec.dcs.is_empty() {
        return Err(ConfigError::NoDatacenters {
            namespace,
            name: cluster.name_any(),
        });
    }
    Ok(namespace)
}

/// Configuration issues that expose unencrypted traffic.
#[must_use]
pub fn insecure_setup_warnings(cluster: &CassandraCluster) -> Vec<String> {
    let spec = &cluster.spec;
    let mut warnings = Vec::new();

    if spec.encryption.server.internode_encryption == InternodeEncryption::None
        && !spec.external_regions.is_empty()
    {
        warnings.push(
            "Inter-node encryption is disabled while external regions are declared: replication traffic between regions is unencrypted"
                .to_string(),
        );
    }
    if spec.host_port.enabled
        && spec.host_port.ports.iter().any(|p| p == HOST_PORT_CQL)
        && !spec.encryption.client.enabled
    {
        warnings.push(
            "CQL is exposed on the host network without client encryption".to_string(),
        );
    }
    warnings
}

async fn warn_insecure_setup<S, C, P, E>(ctx: &Context<S, C, P, E>, cluster: &CassandraCluster)
where
    E: EventSink,
{
    for message in insecure_setup_warnings(cluster) {
        warn!(cluster = %cluster.name_any(), "{message}");
        ctx.events
            .publish(cluster, Severity::Warning, REASON_INSECURE_SETUP, &message)
            .await;
    }
}

/// Read the operator-supplied credential and make sure the admin secret maps back
/// to this cluster.
async fn load_desired_credential<S, C, P, E>(
    ctx: &Context<S, C, P, E>,
    cluster: &CassandraCluster,
    namespace: &str,
) -> Result<Credential>
where
    S: ObjectStore,
    E: EventSink,
{
    let secret_name = &cluster.spec.admin_role_secret_name;

    let Some(mut secret) = ctx
        .store
        .get::<Secret>(namespace, secret_name)
        .await
        .with_context(|| format!("Failed to read admin role secret {namespace}/{secret_name}"))?
    else {
        let err = CredentialError::AdminSecretNotFound {
            namespace: namespace.to_string(),
            name: secret_name.clone(),
        };
        ctx.events
            .publish(
                cluster,
                Severity::Warning,
                REASON_ADMIN_ROLE_SECRET_NOT_FOUND,
                &err.to_string(),
            )
            .await;
        return Err(err.into());
    };

    let credential = match Credential::from_secret(&secret) {
        Ok(credential) => credential,
        Err(reason) => {
            let err = CredentialError::AdminSecretInvalid {
                namespace: namespace.to_string(),
                name: secret_name.clone(),
                reason,
            };
            ctx.events
                .publish(
                    cluster,
                    Severity::Warning,
                    REASON_ADMIN_ROLE_SECRET_INVALID,
                    &err.to_string(),
                )
                .await;
            return Err(err.into());
        }
    };

    let cluster_name = cluster.name_any();
    let annotations = secret.annotations_mut();
    if annotations.get(CLUSTER_ANNOTATION) != Some(&cluster_name) {
        annotations.insert(CLUSTER_ANNOTATION.to_string(), cluster_name.clone());
        ctx.store
            .update(namespace, &secret)
            .await
            .with_context(|| format!("Failed to annotate admin role secret {namespace}/{secret_name}"))?;
        debug!(cluster = %cluster_name, secret = %secret_name, "Annotated admin role secret");
    }

    Ok(credential)
}

/// Status reason describing a failed pass.
fn failure_reason(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<ConfigError>().is_some() {
        return REASON_CONFIGURATION_INVALID;
    }
    match err.downcast_ref::<CredentialError>() {
        Some(CredentialError::AdminSecretNotFound { .. }) => REASON_ADMIN_SECRET_NOT_FOUND,
        Some(CredentialError::AdminSecretInvalid { .. }) => REASON_ADMIN_SECRET_INVALID,
        Some(_) => REASON_CREDENTIAL_ROTATION_FAILED,
        None => REASON_RECONCILE_FAILED,
    }
}

#[cfg(test)]
#[path = "cassandracluster_tests.rs"]
mod cassandracluster_tests;
