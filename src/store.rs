// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed object store capability over namespaced Kubernetes objects.
//!
//! Reconcilers talk to the cluster-management API exclusively through
//! [`ObjectStore`], which keeps the convergence and credential logic testable
//! against an in-memory store. [`KubeStore`] is the production implementation
//! over `kube::Api`.
//!
//! # Semantics
//!
//! - `get` returns `Ok(None)` for a missing object; every other failure is an error.
//! - `update` replaces the object using its `resourceVersion` for optimistic
//!   concurrency. A stale version surfaces as [`StoreError::Conflict`].
//! - `delete` of a missing object succeeds.

use crate::crd::{CassandraCluster, CassandraClusterStatus};
use crate::errors::StoreError;
use async_trait::async_trait;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

/// Bound shared by every object kind the operator reads or writes.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> StoreObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Get/create/update/delete on typed, namespaced objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by name. `Ok(None)` means the object does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str)
        -> Result<Option<K>, StoreError>;

    /// Create an object. Returns the object as persisted.
    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError>;

    /// Replace an existing object in place. Returns the object as persisted.
    async fn update<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError>;

    /// Delete an object by name. Deleting a missing object succeeds.
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Merge-patch the status subresource of a `CassandraCluster`.
    async fn patch_cluster_status(
        &self,
        namespace: &str,
        name: &str,
        status: &CassandraClusterStatus,
    ) -> Result<(), StoreError>;
}

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a `kube::Error` to a [`StoreError`], classifying conflicts and rejections.
fn classify(
    err: kube::Error,
    kind: &str,
    namespace: &str,
    name: &str,
    operation: &'static str,
) -> StoreError {
    match &err {
        kube::Error::Api(resp) if resp.code == 409 => StoreError::Conflict {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            operation,
        },
        kube::Error::Api(resp) if resp.code == 422 => StoreError::Rejected {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            operation,
            reason: resp.message.clone(),
        },
        _ => StoreError::Api {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            operation,
            source: err,
        },
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| classify(e, &K::kind(&()), namespace, name, "get"))
    }

    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let created = api
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| classify(e, &K::kind(&()), namespace, &name, "create"))?;
        debug!("Created {} {}/{}", K::kind(&()), namespace, name);
        Ok(created)
    }

    async fn update<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let updated = api
            .replace(&name, &PostParams::default(), object)
            .await
            .map_err(|e| classify(e, &K::kind(&()), namespace, &name, "update"))?;
        debug!("Replaced {} {}/{}", K::kind(&()), namespace, name);
        Ok(updated)
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                debug!("Deleted {} {}/{}", K::kind(&()), namespace, name);
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                debug!(
                    "{} {}/{} already absent, nothing to delete",
                    K::kind(&()),
                    namespace,
                    name
                );
                Ok(())
            }
            Err(e) => Err(classify(e, &K::kind(&()), namespace, name, "delete")),
        }
    }

    async fn patch_cluster_status(
        &self,
        namespace: &str,
        name: &str,
        status: &CassandraClusterStatus,
    ) -> Result<(), StoreError> {
        let api: Api<CassandraCluster> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| {
                classify(
                    e,
                    &CassandraCluster::kind(&()),
                    namespace,
                    name,
                    "patch status of",
                )
            })?;
        Ok(())
    }
}
