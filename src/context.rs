// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context handed to every reconciliation pass.
//!
//! The context bundles the external capabilities a pass depends on:
//! - [`ObjectStore`] for typed Kubernetes objects
//! - [`CqlConnector`] for admin role management in Cassandra
//! - [`RegionProber`] for remote region readiness
//! - [`EventSink`] for operational events
//!
//! The controller binary wires the production implementations together in
//! [`OperatorContext`]; tests substitute in-memory fakes.

use crate::config::Settings;
use crate::cql::{CqlConnector, ScyllaConnector};
use crate::events::{EventSink, KubeEventSink};
use crate::prober::{HttpRegionProber, RegionProber};
use crate::store::{KubeStore, ObjectStore};

/// Capabilities and settings used by a reconciliation pass.
///
/// Passes keep no memory of their own; everything they need is re-derived from
/// the store and the database through these capabilities.
pub struct Context<S, C, P, E> {
    pub store: S,
    pub cql: C,
    pub prober: P,
    pub events: E,
    pub settings: Settings,
}

impl<S, C, P, E> Context<S, C, P, E>
where
    S: ObjectStore,
    C: CqlConnector,
    P: RegionProber,
    E: EventSink,
{
    #[must_use]
    pub fn new(store: S, cql: C, prober: P, events: E, settings: Settings) -> Self {
        Self {
            store,
            cql,
            prober,
            events,
            settings,
        }
    }
}

/// Context of the running operator.
pub type OperatorContext = Context<KubeStore, ScyllaConnector, HttpRegionProber, KubeEventSink>;
