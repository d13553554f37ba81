// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use cassandra_operator::{
    config::{LogFormat, OperatorConfig},
    constants::{
        CONFLICT_REQUEUE_DURATION_SECS, ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_BIND_ADDRESS,
        METRICS_SERVER_PATH, READY_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS,
    },
    context::{Context, OperatorContext},
    cql::ScyllaConnector,
    crd::CassandraCluster,
    errors::StoreError,
    events::KubeEventSink,
    labels::CLUSTER_ANNOTATION,
    metrics,
    prober::HttpRegionProber,
    reconcilers::{reconcile_cassandracluster, Outcome},
    store::KubeStore,
};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const RESOURCE_TYPE: &str = "CassandraCluster";

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

impl ReconcileError {
    /// Returns `true` when the pass lost an optimistic-concurrency race.
    fn is_conflict(&self) -> bool {
        self.0
            .chain()
            .any(|cause| cause.downcast_ref::<StoreError>().is_some_and(StoreError::is_conflict))
    }
}

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("cassandra-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_tracing(format: LogFormat) {
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_tracing(config.log_format);
    info!("Starting Cassandra operator");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let prober = HttpRegionProber::new(config.probe_timeout(), config.prober_auth())?;
    let ctx: Arc<OperatorContext> = Arc::new(Context::new(
        KubeStore::new(client.clone()),
        ScyllaConnector::new(config.cql_connect_timeout()),
        prober,
        KubeEventSink::new(client.clone()),
        config.settings(),
    ));

    tokio::select! {
        result = run_controller(client, config.namespace.as_deref(), ctx) => {
            controller_exit(result)
        }
        result = run_metrics_server(config.metrics_port) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// The controller only returns `Ok` after a graceful shutdown.
fn controller_exit(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            info!("CassandraCluster controller stopped, exiting");
            Ok(())
        }
        Err(e) => {
            error!("CRITICAL: CassandraCluster controller exited unexpectedly: {e:?}");
            Err(e)
        }
    }
}

/// Run the `CassandraCluster` controller until shutdown is requested.
async fn run_controller(
    client: Client,
    namespace: Option<&str>,
    ctx: Arc<OperatorContext>,
) -> Result<()> {
    let (clusters, secrets) = match namespace {
        Some(ns) => {
            info!("Starting CassandraCluster controller in namespace {ns}");
            (
                Api::<CassandraCluster>::namespaced(client.clone(), ns),
                Api::<Secret>::namespaced(client, ns),
            )
        }
        None => {
            info!("Starting CassandraCluster controller with cluster-wide watch");
            (
                Api::<CassandraCluster>::all(client.clone()),
                Api::<Secret>::all(client),
            )
        }
    };

    Controller::new(clusters, Config::default())
        .owns(secrets.clone(), Config::default())
        .watches(secrets, Config::default(), admin_secret_owner)
        .graceful_shutdown_on(shutdown_signal())
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("Controller event: {e:?}");
            }
            futures::future::ready(())
        })
        .await;

    info!("CassandraCluster controller stopped");
    Ok(())
}

/// Map an operator-supplied admin secret to the cluster that annotated it.
fn admin_secret_owner(secret: Secret) -> Option<ObjectRef<CassandraCluster>> {
    let cluster = secret.annotations().get(CLUSTER_ANNOTATION)?;
    let namespace = secret.namespace()?;
    Some(ObjectRef::new(cluster).within(&namespace))
}

async fn reconcile(
    cluster: Arc<CassandraCluster>,
    ctx: Arc<OperatorContext>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    debug!(
        cluster = %cluster.name_any(),
        namespace = ?cluster.namespace(),
        "Reconcile wrapper called for CassandraCluster"
    );

    match reconcile_cassandracluster(&*ctx, &*cluster).await {
        Ok(outcome) => {
            metrics::record_reconciliation_success(RESOURCE_TYPE, start.elapsed());
            if outcome.is_retry() {
                metrics::record_reconciliation_requeue(RESOURCE_TYPE, "deferred");
            }
            info!(
                "Successfully reconciled CassandraCluster: {}",
                cluster.name_any()
            );
            Ok(requeue_action(outcome))
        }
        Err(e) => {
            metrics::record_reconciliation_error(RESOURCE_TYPE, start.elapsed());
            error!("Failed to reconcile CassandraCluster {}: {e:#}", cluster.name_any());
            Err(e.into())
        }
    }
}

/// Requeue interval after a successful pass.
fn requeue_action(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Done => Action::requeue(Duration::from_secs(READY_REQUEUE_DURATION_SECS)),
        Outcome::RetryAfter(delay) => Action::requeue(delay),
    }
}

/// Requeue interval after a failed pass.
fn error_requeue(err: &ReconcileError) -> Duration {
    if err.is_conflict() {
        Duration::from_secs(CONFLICT_REQUEUE_DURATION_SECS)
    } else {
        Duration::from_secs(ERROR_REQUEUE_DURATION_SECS)
    }
}

/// Error policy for controller
fn error_policy(
    _resource: Arc<CassandraCluster>,
    err: &ReconcileError,
    _ctx: Arc<OperatorContext>,
) -> Action {
    let reason = if err.is_conflict() { "conflict" } else { "error" };
    metrics::record_reconciliation_requeue(RESOURCE_TYPE, reason);
    Action::requeue(error_requeue(err))
}

/// Serve Prometheus metrics.
async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let listener =
        tokio::net::TcpListener::bind((METRICS_SERVER_BIND_ADDRESS, port)).await?;
    info!("Serving metrics on {METRICS_SERVER_BIND_ADDRESS}:{port}{METRICS_SERVER_PATH}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    metrics::gather_metrics().map_err(|e| {
        warn!("Failed to gather metrics: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// Resolves on SIGTERM (Unix) or Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
