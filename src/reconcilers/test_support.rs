// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory capabilities for reconciler tests.
//!
//! - [`MemoryStore`] keeps objects as JSON, bumps `resourceVersion` on every write,
//!   rejects in-place edits of immutable objects and logs every call.
//! - [`FakeCql`] keeps a role table and keyspace replication, can delay the
//!   visibility of role changes to simulate propagation lag, and logs every call.
//! - [`FakeProber`] answers readiness and datacenter lists from fixed tables.
//! - [`RecordingEvents`] keeps published events.

use crate::config::Settings;
use crate::context::Context;
use crate::cql::{CqlConnector, CqlSession, Replication, RoleOptions};
use crate::crd::{CassandraCluster, CassandraClusterSpec, CassandraClusterStatus, DC};
use crate::errors::{CqlError, ProbeError, StoreError};
use crate::events::{EventSink, Severity};
use crate::prober::RegionProber;
use crate::store::{ObjectStore, StoreObject};
use async_trait::async_trait;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Object store
// ============================================================================

/// One call made against [`MemoryStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    Get { kind: String, name: String },
    Create { kind: String, name: String },
    Update { kind: String, name: String },
    Delete { kind: String, name: String },
    PatchStatus { name: String },
}

impl StoreCall {
    /// Returns `true` for calls that change the store.
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::Get { .. })
    }
}

type ObjectKey = (String, String, String);

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<ObjectKey, Value>,
    statuses: BTreeMap<(String, String), CassandraClusterStatus>,
    calls: Vec<StoreCall>,
    version: u64,
}

/// In-memory [`ObjectStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

fn key<K: StoreObject>(namespace: &str, name: &str) -> ObjectKey {
    (K::kind(&()).to_string(), namespace.to_string(), name.to_string())
}

fn encoding_error<K: StoreObject>(namespace: &str, name: &str, e: &serde_json::Error) -> StoreError {
    StoreError::Encoding {
        kind: K::kind(&()).to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        reason: e.to_string(),
    }
}

/// Object content the store compares when enforcing immutability.
fn payload(value: &Value) -> Value {
    let mut value = value.clone();
    if let Some(map) = value.as_object_mut() {
        map.remove("metadata");
        map.remove("status");
    }
    value
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without logging a call. Returns it as stored.
    pub fn insert<K: StoreObject>(&self, namespace: &str, object: K) -> K {
        let mut state = self.state.lock().unwrap();
        state.version += 1;
        let mut value = serde_json::to_value(&object).unwrap();
        value["metadata"]["namespace"] = Value::String(namespace.to_string());
        value["metadata"]["resourceVersion"] = Value::String(state.version.to_string());
        state
            .objects
            .insert(key::<K>(namespace, &object.name_any()), value.clone());
        serde_json::from_value(value).unwrap()
    }

    /// Read an object without logging a call.
    pub fn object<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&key::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Last status patched for a cluster.
    pub fn cluster_status(&self, namespace: &str, name: &str) -> Option<CassandraClusterStatus> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Get {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
        });
        state
            .objects
            .get(&key::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(|e| encoding_error::<K>(namespace, name, &e))
    }

    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Create {
            kind: K::kind(&()).to_string(),
            name: name.clone(),
        });

        let k = key::<K>(namespace, &name);
        if state.objects.contains_key(&k) {
            return Err(StoreError::Conflict {
                kind: K::kind(&()).to_string(),
                namespace: namespace.to_string(),
                name,
                operation: "create",
            });
        }

        state.version += 1;
        let mut value =
            serde_json::to_value(object).map_err(|e| encoding_error::<K>(namespace, &name, &e))?;
        value["metadata"]["namespace"] = Value::String(namespace.to_string());
        value["metadata"]["resourceVersion"] = Value::String(state.version.to_string());
        state.objects.insert(k, value.clone());
        serde_json::from_value(value).map_err(|e| encoding_error::<K>(namespace, &name, &e))
    }

    async fn update<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let kind = K::kind(&()).to_string();
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Update {
            kind: kind.clone(),
            name: name.clone(),
        });

        let k = key::<K>(namespace, &name);
        let Some(actual) = state.objects.get(&k).cloned() else {
            return Err(StoreError::Rejected {
                kind,
                namespace: namespace.to_string(),
                name,
                operation: "update",
                reason: "not found".to_string(),
            });
        };

        let mut value =
            serde_json::to_value(object).map_err(|e| encoding_error::<K>(namespace, &name, &e))?;

        if value["metadata"]["resourceVersion"] != actual["metadata"]["resourceVersion"] {
            return Err(StoreError::Conflict {
                kind,
                namespace: namespace.to_string(),
                name,
                operation: "update",
            });
        }
        if actual["immutable"] == Value::Bool(true) && payload(&actual) != payload(&value) {
            return Err(StoreError::Rejected {
                kind,
                namespace: namespace.to_string(),
                name,
                operation: "update",
                reason: "field is immutable when `immutable` is set".to_string(),
            });
        }

        state.version += 1;
        value["metadata"]["namespace"] = Value::String(namespace.to_string());
        value["metadata"]["resourceVersion"] = Value::String(state.version.to_string());
        state.objects.insert(k, value.clone());
        serde_json::from_value(value).map_err(|e| encoding_error::<K>(namespace, &name, &e))
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Delete {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
        });
        state.objects.remove(&key::<K>(namespace, name));
        Ok(())
    }

    async fn patch_cluster_status(
        &self,
        namespace: &str,
        name: &str,
        status: &CassandraClusterStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::PatchStatus {
            name: name.to_string(),
        });
        state
            .statuses
            .insert((namespace.to_string(), name.to_string()), status.clone());
        Ok(())
    }
}

// ============================================================================
// CQL
// ============================================================================

/// One call made against [`FakeCql`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CqlCall {
    Open { role: String, password: String, ok: bool },
    CreateRole { role: String, password: String, options: RoleOptions },
    UpdatePassword { role: String, password: String },
    AlterReplication { keyspace: String, replication: Replication },
    Close { role: String },
}

#[derive(Clone, Debug)]
struct RoleEntry {
    password: String,
    /// Password still accepted by lagging nodes, `None` for a freshly created role.
    previous: Option<String>,
    /// Logins left before the change is visible cluster-wide.
    lag: u32,
}

struct CqlState {
    roles: BTreeMap<String, RoleEntry>,
    keyspaces: BTreeMap<String, Replication>,
    calls: Vec<CqlCall>,
    propagation_lag: u32,
    fail_mutations: bool,
}

/// `system_auth` as a fresh single-node installation creates it.
pub fn fresh_system_auth() -> Replication {
    Replication::from([
        (
            "class".to_string(),
            "org.apache.cassandra.locator.SimpleStrategy".to_string(),
        ),
        ("replication_factor".to_string(), "1".to_string()),
    ])
}

impl Default for CqlState {
    fn default() -> Self {
        Self {
            roles: BTreeMap::new(),
            keyspaces: BTreeMap::from([("system_auth".to_string(), fresh_system_auth())]),
            calls: Vec::new(),
            propagation_lag: 0,
            fail_mutations: false,
        }
    }
}

impl CqlState {
    fn accepts(&self, role: &str, password: &str) -> bool {
        self.roles.get(role).is_some_and(|entry| {
            if entry.lag > 0 {
                entry.previous.as_deref() == Some(password)
            } else {
                entry.password == password
            }
        })
    }
}

/// In-memory [`CqlConnector`].
#[derive(Clone, Default)]
pub struct FakeCql {
    state: Arc<Mutex<CqlState>>,
}

impl FakeCql {
    /// A cluster that only knows the built-in `cassandra/cassandra` role.
    pub fn with_default_role() -> Self {
        let cql = Self::default();
        cql.add_role("cassandra", "cassandra");
        cql
    }

    pub fn add_role(&self, role: &str, password: &str) {
        self.state.lock().unwrap().roles.insert(
            role.to_string(),
            RoleEntry {
                password: password.to_string(),
                previous: None,
                lag: 0,
            },
        );
    }

    /// Number of logins that keep seeing the old state after each role change.
    pub fn set_propagation_lag(&self, logins: u32) {
        self.state.lock().unwrap().propagation_lag = logins;
    }

    /// Make role creation and password changes fail.
    pub fn fail_mutations(&self) {
        self.state.lock().unwrap().fail_mutations = true;
    }

    /// Whether a login would currently succeed, without consuming propagation lag.
    pub fn can_login(&self, role: &str, password: &str) -> bool {
        self.state.lock().unwrap().accepts(role, password)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.state.lock().unwrap().roles.contains_key(role)
    }

    pub fn replication(&self, keyspace: &str) -> Option<Replication> {
        self.state.lock().unwrap().keyspaces.get(keyspace).cloned()
    }

    pub fn set_replication(&self, keyspace: &str, replication: Replication) {
        self.state
            .lock()
            .unwrap()
            .keyspaces
            .insert(keyspace.to_string(), replication);
    }

    pub fn drop_keyspace(&self, keyspace: &str) {
        self.state.lock().unwrap().keyspaces.remove(keyspace);
    }

    pub fn calls(&self) -> Vec<CqlCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Role creations and password changes.
    pub fn mutations(&self) -> Vec<CqlCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, CqlCall::CreateRole { .. } | CqlCall::UpdatePassword { .. }))
            .collect()
    }

    /// Keyspace replication changes.
    pub fn replication_changes(&self) -> Vec<CqlCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, CqlCall::AlterReplication { .. }))
            .collect()
    }
}

/// Session opened by [`FakeCql`].
pub struct FakeSession {
    role: String,
    state: Arc<Mutex<CqlState>>,
}

fn mutation_error(statement: &str) -> CqlError {
    CqlError::Statement {
        endpoint: "fake".to_string(),
        statement: statement.to_string(),
        reason: "Unauthorized".to_string(),
    }
}

#[async_trait]
impl CqlConnector for FakeCql {
    type Session = FakeSession;

    async fn open(
        &self,
        endpoint: &str,
        role: &str,
        password: &str,
    ) -> Result<FakeSession, CqlError> {
        let mut state = self.state.lock().unwrap();
        let ok = state.accepts(role, password);
        if let Some(entry) = state.roles.get_mut(role) {
            entry.lag = entry.lag.saturating_sub(1);
        }
        state.calls.push(CqlCall::Open {
            role: role.to_string(),
            password: password.to_string(),
            ok,
        });

        if ok {
            Ok(FakeSession {
                role: role.to_string(),
                state: Arc::clone(&self.state),
            })
        } else {
            Err(CqlError::Connect {
                endpoint: endpoint.to_string(),
                role: role.to_string(),
                reason: "Provided username and/or password are incorrect".to_string(),
            })
        }
    }
}

#[async_trait]
impl CqlSession for FakeSession {
    async fn role_exists(&self, role: &str) -> Result<bool, CqlError> {
        Ok(self.state.lock().unwrap().roles.contains_key(role))
    }

    async fn create_role(
        &self,
        role: &str,
        password: &str,
        options: RoleOptions,
    ) -> Result<(), CqlError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(CqlCall::CreateRole {
            role: role.to_string(),
            password: password.to_string(),
            options,
        });
        if state.fail_mutations {
            return Err(mutation_error("CREATE ROLE"));
        }
        let lag = state.propagation_lag;
        state.roles.entry(role.to_string()).or_insert(RoleEntry {
            password: password.to_string(),
            previous: None,
            lag,
        });
        Ok(())
    }

    async fn update_role_password(&self, role: &str, password: &str) -> Result<(), CqlError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(CqlCall::UpdatePassword {
            role: role.to_string(),
            password: password.to_string(),
        });
        if state.fail_mutations {
            return Err(mutation_error("ALTER ROLE"));
        }
        let lag = state.propagation_lag;
        let Some(entry) = state.roles.get_mut(role) else {
            return Err(mutation_error("ALTER ROLE"));
        };
        entry.previous = Some(std::mem::replace(&mut entry.password, password.to_string()));
        entry.lag = lag;
        Ok(())
    }

    async fn keyspace_replication(&self, keyspace: &str) -> Result<Option<Replication>, CqlError> {
        Ok(self.state.lock().unwrap().keyspaces.get(keyspace).cloned())
    }

    async fn alter_keyspace_replication(
        &self,
        keyspace: &str,
        replication: &Replication,
    ) -> Result<(), CqlError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(CqlCall::AlterReplication {
            keyspace: keyspace.to_string(),
            replication: replication.clone(),
        });
        state
            .keyspaces
            .insert(keyspace.to_string(), replication.clone());
        Ok(())
    }

    async fn close(self) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(CqlCall::Close { role: self.role });
    }
}

// ============================================================================
// Prober and events
// ============================================================================

/// [`RegionProber`] answering from fixed tables. Unknown hosts are unreachable.
#[derive(Clone, Default)]
pub struct FakeProber {
    answers: Arc<Mutex<BTreeMap<String, bool>>>,
    dcs: Arc<Mutex<BTreeMap<String, Vec<DC>>>>,
    probed: Arc<Mutex<Vec<String>>>,
}

fn unreachable(host: &str) -> ProbeError {
    ProbeError::Request {
        host: host.to_string(),
        reason: "connection refused".to_string(),
    }
}

impl FakeProber {
    pub fn set_ready(&self, host: &str, ready: bool) {
        self.answers
            .lock()
            .unwrap()
            .insert(host.to_string(), ready);
    }

    pub fn set_dcs(&self, host: &str, dcs: &[(&str, i32)]) {
        let dcs = dcs
            .iter()
            .map(|(name, replicas)| DC {
                name: (*name).to_string(),
                replicas: *replicas,
            })
            .collect();
        self.dcs.lock().unwrap().insert(host.to_string(), dcs);
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegionProber for FakeProber {
    async fn region_ready(&self, host: &str) -> Result<bool, ProbeError> {
        self.probed.lock().unwrap().push(host.to_string());
        self.answers
            .lock()
            .unwrap()
            .get(host)
            .copied()
            .ok_or_else(|| unreachable(host))
    }

    async fn region_dcs(&self, host: &str) -> Result<Vec<DC>, ProbeError> {
        self.dcs
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .ok_or_else(|| unreachable(host))
    }
}

/// [`EventSink`] keeping `(severity, reason, message)` of every event.
#[derive(Clone, Default)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<(Severity, String, String)>>>,
}

impl RecordingEvents {
    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, reason, _)| reason.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(severity, _, _)| *severity == Severity::Warning)
            .map(|(_, reason, _)| reason.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingEvents {
    async fn publish(
        &self,
        _cluster: &CassandraCluster,
        severity: Severity,
        reason: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((severity, reason.to_string(), message.to_string()));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub type TestContext = Context<MemoryStore, FakeCql, FakeProber, RecordingEvents>;

pub const NAMESPACE: &str = "db";
pub const CLUSTER: &str = "cc";

/// Context with no verification delay.
pub fn test_context(cql: FakeCql) -> TestContext {
    let settings = Settings {
        retry_delay: Duration::from_secs(10),
        verify_attempts: 3,
        verify_initial_delay: Duration::ZERO,
        verify_max_delay: Duration::ZERO,
    };
    Context::new(
        MemoryStore::new(),
        cql,
        FakeProber::default(),
        RecordingEvents::default(),
        settings,
    )
}

/// A cluster `cc` in namespace `db` with the given datacenters.
pub fn test_cluster(dcs: &[(&str, i32)]) -> CassandraCluster {
    let spec = CassandraClusterSpec {
        dcs: dcs
            .iter()
            .map(|(name, replicas)| DC {
                name: (*name).to_string(),
                replicas: *replicas,
            })
            .collect(),
        admin_role_secret_name: "admin-role".to_string(),
        external_regions: Default::default(),
        encryption: Default::default(),
        jmx: Default::default(),
        host_port: Default::default(),
        persistence: Default::default(),
        reaper: Default::default(),
        ingress: Default::default(),
    };
    let mut cluster = CassandraCluster::new(CLUSTER, spec);
    cluster.metadata = ObjectMeta {
        name: Some(CLUSTER.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        uid: Some("5b0a5c8e-0000-4000-8000-000000000001".to_string()),
        generation: Some(1),
        ..ObjectMeta::default()
    };
    cluster
}
