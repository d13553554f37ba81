// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Database session capability used to manage the admin role.
//!
//! The credential lifecycle needs a small slice of Cassandra: open a session as
//! a role, look up and mutate roles, and keep the `system_auth` keyspace
//! replicated to every datacenter. [`CqlConnector`] and [`CqlSession`] express
//! exactly that; [`ScyllaConnector`] implements them with the `scylla` driver.
//!
//! A failed login is an expected outcome while a rotation propagates and is
//! reported as [`CqlError::Connect`], never as a panic or a retry.
//!
//! Statements are rendered by pure functions. Role names are quoted as
//! identifiers and passwords as string literals, so neither can break out of
//! the statement.

use crate::errors::CqlError;
use async_trait::async_trait;
use scylla::{Session, SessionBuilder};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Attributes of a created role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleOptions {
    pub superuser: bool,
    pub login: bool,
}

impl RoleOptions {
    /// Options of an operator admin role.
    pub const ADMIN: RoleOptions = RoleOptions {
        superuser: true,
        login: true,
    };
}

/// Keyspace replication options, including the `class` entry.
pub type Replication = BTreeMap<String, String>;

/// An authenticated session.
#[async_trait]
pub trait CqlSession: Send + Sync + Sized {
    /// Whether `role` exists.
    async fn role_exists(&self, role: &str) -> Result<bool, CqlError>;

    /// Create a role with the given password.
    ///
    /// A role that already exists is left untouched, password included.
    async fn create_role(
        &self,
        role: &str,
        password: &str,
        options: RoleOptions,
    ) -> Result<(), CqlError>;

    /// Change the password of an existing role.
    async fn update_role_password(&self, role: &str, password: &str) -> Result<(), CqlError>;

    /// Replication options of `keyspace`, `None` if it does not exist.
    async fn keyspace_replication(&self, keyspace: &str) -> Result<Option<Replication>, CqlError>;

    /// Replace the replication options of `keyspace`.
    async fn alter_keyspace_replication(
        &self,
        keyspace: &str,
        replication: &Replication,
    ) -> Result<(), CqlError>;

    /// Close the session.
    async fn close(self);
}

/// Opens sessions against a CQL endpoint.
#[async_trait]
pub trait CqlConnector: Send + Sync {
    type Session: CqlSession;

    /// Open a session as `role`. Authentication failures are [`CqlError::Connect`].
    async fn open(
        &self,
        endpoint: &str,
        role: &str,
        password: &str,
    ) -> Result<Self::Session, CqlError>;
}

// ============================================================================
// Statement rendering
// ============================================================================

/// Existence check of a role.
pub const SELECT_ROLE_STATEMENT: &str = "SELECT role FROM system_auth.roles WHERE role = ?";

/// Replication options of a keyspace.
pub const SELECT_REPLICATION_STATEMENT: &str =
    "SELECT replication FROM system_schema.keyspaces WHERE keyspace_name = ?";

/// Quote a role name as a CQL identifier.
#[must_use]
pub fn quote_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quote a value as a CQL string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE ROLE IF NOT EXISTS` statement for `role`.
#[must_use]
pub fn create_role_statement(role: &str, password: &str, options: RoleOptions) -> String {
    format!(
        "CREATE ROLE IF NOT EXISTS {} WITH SUPERUSER = {} AND LOGIN = {} AND PASSWORD = {}",
        quote_identifier(role),
        options.superuser,
        options.login,
        quote_literal(password)
    )
}

/// `ALTER ROLE ... WITH PASSWORD` statement for `role`.
#[must_use]
pub fn update_password_statement(role: &str, password: &str) -> String {
    format!(
        "ALTER ROLE {} WITH PASSWORD = {}",
        quote_identifier(role),
        quote_literal(password)
    )
}

/// `ALTER KEYSPACE ... WITH replication` statement for `keyspace`.
#[must_use]
pub fn alter_replication_statement(keyspace: &str, replication: &Replication) -> String {
    let options = replication
        .iter()
        .map(|(key, value)| format!("{}: {}", quote_literal(key), quote_literal(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "ALTER KEYSPACE {} WITH replication = {{{options}}}",
        quote_identifier(keyspace)
    )
}

// ============================================================================
// Scylla driver implementation
// ============================================================================

/// [`CqlConnector`] backed by the `scylla` driver.
#[derive(Clone, Debug)]
pub struct ScyllaConnector {
    connect_timeout: Duration,
}

impl ScyllaConnector {
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

/// Session opened by [`ScyllaConnector`].
pub struct ScyllaSession {
    endpoint: String,
    session: Session,
}

impl ScyllaSession {
    async fn execute(&self, statement: String, redacted: String) -> Result<(), CqlError> {
        self.session
            .query_unpaged(statement, ())
            .await
            .map(|_| ())
            .map_err(|e| CqlError::Statement {
                endpoint: self.endpoint.clone(),
                statement: redacted,
                reason: e.to_string(),
            })
    }

    fn read_error(&self, statement: &str, reason: String) -> CqlError {
        CqlError::Statement {
            endpoint: self.endpoint.clone(),
            statement: statement.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl CqlConnector for ScyllaConnector {
    type Session = ScyllaSession;

    async fn open(
        &self,
        endpoint: &str,
        role: &str,
        password: &str,
    ) -> Result<ScyllaSession, CqlError> {
        debug!(endpoint = %endpoint, role = %role, "Opening CQL session");
        let session = SessionBuilder::new()
            .known_node(endpoint)
            .user(role, password)
            .connection_timeout(self.connect_timeout)
            .build()
            .await
            .map_err(|e| CqlError::Connect {
                endpoint: endpoint.to_string(),
                role: role.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ScyllaSession {
            endpoint: endpoint.to_string(),
            session,
        })
    }
}

#[async_trait]
impl CqlSession for ScyllaSession {
    async fn role_exists(&self, role: &str) -> Result<bool, CqlError> {
        let rows = self
            .session
            .query_unpaged(SELECT_ROLE_STATEMENT, (role,))
            .await
            .map_err(|e| self.read_error(SELECT_ROLE_STATEMENT, e.to_string()))?
            .into_rows_result()
            .map_err(|e| self.read_error(SELECT_ROLE_STATEMENT, e.to_string()))?;
        Ok(rows.rows_num() > 0)
    }

    async fn create_role(
        &self,
        role: &str,
        password: &str,
        options: RoleOptions,
    ) -> Result<(), CqlError> {
        self.execute(
            create_role_statement(role, password, options),
            format!("CREATE ROLE {}", quote_identifier(role)),
        )
        .await
    }

    async fn update_role_password(&self, role: &str, password: &str) -> Result<(), CqlError> {
        self.execute(
            update_password_statement(role, password),
            format!("ALTER ROLE {}", quote_identifier(role)),
        )
        .await
    }

    async fn keyspace_replication(&self, keyspace: &str) -> Result<Option<Replication>, CqlError> {
        let rows = self
            .session
            .query_unpaged(SELECT_REPLICATION_STATEMENT, (keyspace,))
            .await
            .map_err(|e| self.read_error(SELECT_REPLICATION_STATEMENT, e.to_string()))?
            .into_rows_result()
            .map_err(|e| self.read_error(SELECT_REPLICATION_STATEMENT, e.to_string()))?;
        let row = rows
            .maybe_first_row::<(Replication,)>()
            .map_err(|e| self.read_error(SELECT_REPLICATION_STATEMENT, e.to_string()))?;
        Ok(row.map(|(replication,)| replication))
    }

    async fn alter_keyspace_replication(
        &self,
        keyspace: &str,
        replication: &Replication,
    ) -> Result<(), CqlError> {
        let statement = alter_replication_statement(keyspace, replication);
        self.execute(statement.clone(), statement).await
    }

    async fn close(self) {
        debug!(endpoint = %self.endpoint, "Closing CQL session");
        drop(self.session);
    }
}

#[cfg(test)]
#[path = "cql_tests.rs"]
mod cql_tests;
