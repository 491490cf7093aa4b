//! CRM schema steps and the executor that applies them.
//!
//! # Responsibility
//! - List the schema steps (tables, then tenant-leading indexes) in order.
//! - Apply pending steps in one transaction and verify tenant partitioning.
//!
//! # Invariants
//! - `version` values are strictly increasing and mirrored to
//!   `PRAGMA user_version` after each step.
//! - Every user table carries a `tenant_id` column. This is checked after
//!   every migration run, including no-op runs on an up-to-date file.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "tenant_indexes",
        sql: include_str!("0002_tenant_indexes.sql"),
    },
];

const TENANT_COLUMN: &str = "tenant_id";

/// Latest schema version this build knows how to produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`] and verifies tenant partitioning.
///
/// A file written by a newer build is refused untouched. A failing step
/// rolls back every step of this run.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    if from_version < latest {
        let tx = conn.transaction()?;
        for migration in MIGRATIONS
            .iter()
            .filter(|migration| migration.version > from_version)
        {
            debug!(
                "event=db_migrate_step module=db status=start version={} name={}",
                migration.version, migration.name
            );
            tx.execute_batch(migration.sql)
                .and_then(|()| {
                    tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
                })
                .map_err(|source| DbError::MigrationFailed {
                    version: migration.version,
                    name: migration.name,
                    source,
                })?;
        }
        tx.commit()?;

        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            from_version, latest
        );
    }

    verify_tenant_columns(conn)
}

/// Fails with [`DbError::UnscopedTable`] for the first user table (by name)
/// that lacks a `tenant_id` column.
pub fn verify_tenant_columns(conn: &Connection) -> DbResult<()> {
    for table in user_tables(conn)? {
        if !has_tenant_column(conn, &table)? {
            return Err(DbError::UnscopedTable { table });
        }
    }
    Ok(())
}

fn user_tables(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name
         FROM sqlite_master
         WHERE type = 'table'
           AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
         ORDER BY name ASC;",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tables)
}

fn has_tenant_column(conn: &Connection, table: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2;",
        [table, TENANT_COLUMN],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, verify_tenant_columns, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn migration_versions_are_strictly_increasing() {
        assert!(MIGRATIONS
            .windows(2)
            .all(|pair| pair[0].version < pair[1].version));
        assert_eq!(latest_version(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn migrated_schema_is_tenant_partitioned() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        verify_tenant_columns(&conn).unwrap();
    }

    #[test]
    fn table_without_tenant_column_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute_batch("CREATE TABLE audit_log (id TEXT PRIMARY KEY, entry TEXT);")
            .unwrap();

        match verify_tenant_columns(&conn) {
            Err(DbError::UnscopedTable { table }) => assert_eq!(table, "audit_log"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            apply_migrations(&mut conn),
            Err(DbError::UnscopedTable { .. })
        ));
    }

    #[test]
    fn failing_step_reports_version_and_keeps_schema_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE stages (id TEXT PRIMARY KEY, tenant_id TEXT);")
            .unwrap();

        match apply_migrations(&mut conn) {
            Err(DbError::MigrationFailed { version, name, .. }) => {
                assert_eq!(version, 1);
                assert_eq!(name, "init");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
    }
}
