//! Startup configuration shared by CRM front ends.
//!
//! # Invariants
//! - Resolved once at startup and held for the process lifetime.
//! - The tenant id is never blank.

use crate::db::{open_db, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::model::tenant::TenantId;
use rusqlite::Connection;
use std::path::PathBuf;

/// Database file used when none is configured.
pub const DEFAULT_DB_PATH: &str = "crm.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConfig {
    pub db_path: PathBuf,
    pub tenant_id: TenantId,
    pub log_level: String,
    /// File logging directory; stderr when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            tenant_id: TenantId::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CrmConfig {
    /// Opens and migrates the configured database file.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }

    /// Starts process logging with the configured level and target.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        init_logging(&self.log_level, self.log_dir.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::{CrmConfig, DEFAULT_DB_PATH};
    use crate::model::tenant::TenantId;

    #[test]
    fn default_targets_local_file_and_default_tenant() {
        let config = CrmConfig::default();
        assert_eq!(config.db_path.to_str(), Some(DEFAULT_DB_PATH));
        assert_eq!(config.tenant_id, TenantId::default());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn open_db_creates_migrated_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrmConfig {
            db_path: dir.path().join("crm.sqlite3"),
            ..CrmConfig::default()
        };

        let conn = config.open_db().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
        assert!(config.db_path.exists());
    }
}
