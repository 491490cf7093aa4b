//! CRM store: connection bootstrap, SQL helper functions and schema upgrades.
//!
//! # Responsibility
//! - Hand out connections that are migrated, tenant-partitioned and carry
//!   the scalar functions the contact search relies on.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - After migration every user table has a `tenant_id` column; a store that
//!   violates this is rejected with [`DbError::UnscopedTable`].
//! - Repositories must not touch tenant data before bootstrap succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod functions;
pub mod migrations;
mod open;

pub use functions::{register_sql_functions, CASEFOLD_FUNCTION};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure raised while opening, migrating or verifying the CRM store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite transport or statement error.
    Sqlite(rusqlite::Error),
    /// File was written by a newer build of the CRM.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A migration step failed; `version` is the step that was rolled back.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// A user table exists without a `tenant_id` column.
    UnscopedTable { table: String },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "crm store error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "crm schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "crm migration {version:04}_{name} failed: {source}"),
            Self::UnscopedTable { table } => {
                write!(f, "crm table `{table}` has no tenant_id column")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::UnscopedTable { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
