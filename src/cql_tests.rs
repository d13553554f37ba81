// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for CQL statement rendering

#[cfg(test)]
mod tests {
    use crate::cql::*;

    #[test]
    fn test_create_role_statement_for_admin() {
        let stmt = create_role_statement("admin", "p1", RoleOptions::ADMIN);
        assert_eq!(
            stmt,
            "CREATE ROLE IF NOT EXISTS \"admin\" WITH SUPERUSER = true AND LOGIN = true AND PASSWORD = 'p1'"
        );
    }

    #[test]
    fn test_create_role_statement_non_superuser() {
        let options = RoleOptions {
            superuser: false,
            login: true,
        };
        let stmt = create_role_statement("reader", "pw", options);
        assert!(stmt.contains("SUPERUSER = false"));
        assert!(stmt.contains("LOGIN = true"));
    }

    #[test]
    fn test_update_password_statement() {
        assert_eq!(
            update_password_statement("cassandra", "s3cret"),
            "ALTER ROLE \"cassandra\" WITH PASSWORD = 's3cret'"
        );
    }

    #[test]
    fn test_password_quotes_are_escaped() {
        let stmt = update_password_statement("admin", "it's'; DROP ROLE admin; --");
        assert_eq!(
            stmt,
            "ALTER ROLE \"admin\" WITH PASSWORD = 'it''s''; DROP ROLE admin; --'"
        );
    }

    #[test]
    fn test_role_name_quotes_are_escaped() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal_plain() {
        assert_eq!(quote_literal("plain"), "'plain'");
    }

    #[test]
    fn test_alter_replication_statement() {
        let replication = Replication::from([
            (
                "class".to_string(),
                "org.apache.cassandra.locator.NetworkTopologyStrategy".to_string(),
            ),
            ("dc1".to_string(), "3".to_string()),
            ("eu-dc1".to_string(), "2".to_string()),
        ]);

        assert_eq!(
            alter_replication_statement("system_auth", &replication),
            "ALTER KEYSPACE \"system_auth\" WITH replication = {'class': 'org.apache.cassandra.locator.NetworkTopologyStrategy', 'dc1': '3', 'eu-dc1': '2'}"
        );
    }
}
