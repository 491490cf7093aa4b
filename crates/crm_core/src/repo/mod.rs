//! Tenant-scoped persistence layer.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQLite query details from the service facade.
//!
//! # Invariants
//! - Every repository is bound to one `TenantId` and every statement filters
//!   or stamps `tenant_id` with it. A row owned by another tenant is treated
//!   exactly like a missing row.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod contact_repo;
pub mod interaction_repo;
pub mod stage_repo;
pub mod stats_repo;
pub mod task_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

pub(crate) const ENTITY_STAGE: &str = "stage";
pub(crate) const ENTITY_CONTACT: &str = "contact";
pub(crate) const ENTITY_INTERACTION: &str = "interaction";
pub(crate) const ENTITY_TASK: &str = "task";

const LIST_DEFAULT_LIMIT: u32 = 50;
const LIST_LIMIT_MAX: u32 = 500;

/// Repository error for CRM persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, passed through unchanged.
    Db(DbError),
    /// Row does not exist for the bound tenant.
    NotFound { entity: &'static str, id: Uuid },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted crm data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "crm repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "crm repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "crm repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Normalizes a list limit: `None`/`0` -> 50, anything above 500 -> 500.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => LIST_DEFAULT_LIMIT,
        Some(value) if value > LIST_LIMIT_MAX => LIST_LIMIT_MAX,
        Some(value) => value,
    }
}

/// Column assignments for a partial `UPDATE ... SET`.
///
/// Values bind to anonymous `?` placeholders in push order, so WHERE
/// bindings must be appended after [`UpdateSet::into_parts`].
#[derive(Debug, Default)]
pub(crate) struct UpdateSet {
    assignments: Vec<String>,
    values: Vec<Value>,
}

impl UpdateSet {
    pub(crate) fn push(&mut self, column: &'static str, value: impl Into<Value>) {
        self.assignments.push(format!("{column} = ?"));
        self.values.push(value.into());
    }

    /// Assigns `column` from a SQL expression holding exactly one `?`.
    pub(crate) fn push_expr(
        &mut self,
        column: &'static str,
        expr: &'static str,
        value: impl Into<Value>,
    ) {
        self.assignments.push(format!("{column} = {expr}"));
        self.values.push(value.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Value>) {
        (self.assignments.join(", "), self.values)
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn encode_json<T: Serialize>(value: &T, column: &'static str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode {column}: {err}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(text: &str, column: &'static str) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

/// Returns whether `id` exists in `table` for `tenant`.
///
/// `table` must be a trusted identifier; it is interpolated into SQL.
pub(crate) fn row_exists(
    conn: &Connection,
    table: &'static str,
    id: Uuid,
    tenant: &str,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1 AND tenant_id = ?2);"),
        [id.to_string(), tenant.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Verifies that the connection is migrated and exposes `table` with
/// every listed column.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    ensure_schema_version(conn)?;
    ensure_table_columns(conn, table, columns)
}

/// Verifies that the connection sits at the latest migration version.
pub(crate) fn ensure_schema_version(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

/// Verifies that `table` exists with every listed column.
pub(crate) fn ensure_table_columns(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
