//! Read-only projections feeding the pipeline and activity reports.
//!
//! # Responsibility
//! - Fetch the narrow column sets the aggregation routines reduce in memory.
//!
//! # Invariants
//! - Every query is filtered by the bound tenant.
//! - Window queries use `>= since` on epoch milliseconds.

use super::stage_repo::list_tenant_stages;
use super::{
    ensure_schema_version, ensure_table_columns, parse_bool, parse_optional_uuid, RepoResult,
};
use crate::model::stage::{Stage, StageId};
use crate::model::tenant::TenantId;
use rusqlite::{params, Connection};

/// Stage reference and deal value of one active contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DealRow {
    pub stage_id: Option<StageId>,
    pub deal_value: Option<f64>,
}

/// Repository interface for aggregation inputs.
pub trait StatsRepository {
    fn tenant(&self) -> &TenantId;
    /// Stages in `position` order.
    fn list_stages(&self) -> RepoResult<Vec<Stage>>;
    /// `(stage_id, deal_value)` of every active contact.
    fn list_active_deals(&self) -> RepoResult<Vec<DealRow>>;
    /// Type string of every interaction created since `since`.
    fn interaction_kinds_since(&self, since: i64) -> RepoResult<Vec<String>>;
    /// Completed flag of every task created since `since`.
    fn task_completion_flags_since(&self, since: i64) -> RepoResult<Vec<bool>>;
    /// Number of tasks whose `completed_at` falls at or after `since`.
    fn count_tasks_completed_since(&self, since: i64) -> RepoResult<u64>;
    /// Active flag of every contact created since `since`.
    fn contact_active_flags_since(&self, since: i64) -> RepoResult<Vec<bool>>;
}

/// SQLite-backed aggregation input repository.
pub struct SqliteStatsRepository<'conn> {
    conn: &'conn Connection,
    tenant: TenantId,
}

impl<'conn> SqliteStatsRepository<'conn> {
    /// Creates repository from a migrated connection bound to `tenant`.
    pub fn try_new(conn: &'conn Connection, tenant: TenantId) -> RepoResult<Self> {
        ensure_schema_version(conn)?;
        ensure_table_columns(conn, "contacts", &["stage_id", "deal_value", "is_active"])?;
        ensure_table_columns(conn, "interactions", &["type", "created_at"])?;
        ensure_table_columns(conn, "tasks", &["completed", "completed_at", "created_at"])?;
        Ok(Self { conn, tenant })
    }
}

impl StatsRepository for SqliteStatsRepository<'_> {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    fn list_stages(&self) -> RepoResult<Vec<Stage>> {
        list_tenant_stages(self.conn, self.tenant.as_str())
    }

    fn list_active_deals(&self) -> RepoResult<Vec<DealRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT stage_id, deal_value
             FROM contacts
             WHERE tenant_id = ?1
               AND is_active = 1;",
        )?;
        let mut rows = stmt.query([self.tenant.as_str()])?;
        let mut deals = Vec::new();
        while let Some(row) = rows.next()? {
            deals.push(DealRow {
                stage_id: parse_optional_uuid(row.get(0)?, "contacts.stage_id")?,
                deal_value: row.get(1)?,
            });
        }
        Ok(deals)
    }

    fn interaction_kinds_since(&self, since: i64) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT type
             FROM interactions
             WHERE tenant_id = ?1
               AND created_at >= ?2;",
        )?;
        let mut rows = stmt.query(params![self.tenant.as_str(), since])?;
        let mut kinds = Vec::new();
        while let Some(row) = rows.next()? {
            kinds.push(row.get(0)?);
        }
        Ok(kinds)
    }

    fn task_completion_flags_since(&self, since: i64) -> RepoResult<Vec<bool>> {
        let mut stmt = self.conn.prepare(
            "SELECT completed
             FROM tasks
             WHERE tenant_id = ?1
               AND created_at >= ?2;",
        )?;
        let mut rows = stmt.query(params![self.tenant.as_str(), since])?;
        let mut flags = Vec::new();
        while let Some(row) = rows.next()? {
            flags.push(parse_bool(row.get(0)?, "tasks.completed")?);
        }
        Ok(flags)
    }

    fn count_tasks_completed_since(&self, since: i64) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM tasks
             WHERE tenant_id = ?1
               AND completed = 1
               AND completed_at >= ?2;",
            params![self.tenant.as_str(), since],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn contact_active_flags_since(&self, since: i64) -> RepoResult<Vec<bool>> {
        let mut stmt = self.conn.prepare(
            "SELECT is_active
             FROM contacts
             WHERE tenant_id = ?1
               AND created_at >= ?2;",
        )?;
        let mut rows = stmt.query(params![self.tenant.as_str(), since])?;
        let mut flags = Vec::new();
        while let Some(row) = rows.next()? {
            flags.push(parse_bool(row.get(0)?, "contacts.is_active")?);
        }
        Ok(flags)
    }
}
