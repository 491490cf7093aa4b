//! Stage repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist pipeline stages for one tenant.
//! - Own seeding and batch reordering, each inside one transaction.
//!
//! # Invariants
//! - Listing order is `position ASC, created_at ASC, id ASC`.
//! - Auto-assigned positions are computed inside the INSERT statement.
//! - Deleting a stage nulls `contacts.stage_id` via `ON DELETE SET NULL`.

use super::{
    ensure_connection_ready, now_epoch_ms, parse_uuid, RepoError, RepoResult, UpdateSet,
    ENTITY_STAGE,
};
use crate::model::stage::{SeedStatus, Stage, StageId, StagePatch, StageSeedOutcome};
use crate::model::tenant::TenantId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const STAGE_SELECT_SQL: &str = "SELECT
    id,
    tenant_id,
    name,
    position,
    color,
    created_at
FROM stages";

const STAGE_COLUMNS: &[&str] = &["id", "tenant_id", "name", "position", "color", "created_at"];

/// Repository interface for stage operations.
pub trait StageRepository {
    /// Tenant every call is scoped to.
    fn tenant(&self) -> &TenantId;
    /// Inserts one stage; `position = None` appends after existing stages.
    fn create_stage(&self, name: &str, position: Option<i64>, color: Option<&str>)
        -> RepoResult<Stage>;
    fn get_stage(&self, id: StageId) -> RepoResult<Option<Stage>>;
    fn list_stages(&self) -> RepoResult<Vec<Stage>>;
    fn update_stage(&self, id: StageId, patch: &StagePatch) -> RepoResult<Stage>;
    fn delete_stage(&self, id: StageId) -> RepoResult<()>;
    /// Seeds `defaults` as `(name, color)` pairs unless any stage exists.
    fn seed_stages(&self, defaults: &[(&str, &str)]) -> RepoResult<StageSeedOutcome>;
    /// Rewrites `position = index + 1` for every listed id.
    fn reorder_stages(&self, ids: &[StageId]) -> RepoResult<()>;
}

/// SQLite-backed stage repository.
pub struct SqliteStageRepository<'conn> {
    conn: &'conn Connection,
    tenant: TenantId,
}

impl<'conn> SqliteStageRepository<'conn> {
    /// Creates repository from a migrated connection bound to `tenant`.
    pub fn try_new(conn: &'conn Connection, tenant: TenantId) -> RepoResult<Self> {
        ensure_connection_ready(conn, "stages", STAGE_COLUMNS)?;
        Ok(Self { conn, tenant })
    }
}

impl StageRepository for SqliteStageRepository<'_> {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    fn create_stage(
        &self,
        name: &str,
        position: Option<i64>,
        color: Option<&str>,
    ) -> RepoResult<Stage> {
        let id = Uuid::new_v4();
        insert_stage(self.conn, self.tenant.as_str(), id, name, position, color)?;
        load_required_stage(self.conn, self.tenant.as_str(), id)
    }

    fn get_stage(&self, id: StageId) -> RepoResult<Option<Stage>> {
        load_stage(self.conn, self.tenant.as_str(), id)
    }

    fn list_stages(&self) -> RepoResult<Vec<Stage>> {
        list_tenant_stages(self.conn, self.tenant.as_str())
    }

    fn update_stage(&self, id: StageId, patch: &StagePatch) -> RepoResult<Stage> {
        let mut set = UpdateSet::default();
        if let Some(name) = patch.name.as_ref() {
            set.push("name", name.clone());
        }
        if let Some(position) = patch.position {
            set.push("position", position);
        }
        if let Some(color) = patch.color.as_ref() {
            set.push("color", color.clone());
        }

        if set.is_empty() {
            return load_required_stage(self.conn, self.tenant.as_str(), id);
        }

        let (assignments, mut bind_values) = set.into_parts();
        bind_values.push(Value::Text(id.to_string()));
        bind_values.push(Value::Text(self.tenant.as_str().to_string()));
        let changed = self.conn.execute(
            &format!("UPDATE stages SET {assignments} WHERE id = ? AND tenant_id = ?;"),
            params_from_iter(bind_values),
        )?;
        if changed == 0 {
            return Err(stage_not_found(id));
        }

        load_required_stage(self.conn, self.tenant.as_str(), id)
    }

    fn delete_stage(&self, id: StageId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM stages WHERE id = ?1 AND tenant_id = ?2;",
            params![id.to_string(), self.tenant.as_str()],
        )?;
        if changed == 0 {
            return Err(stage_not_found(id));
        }
        Ok(())
    }

    fn seed_stages(&self, defaults: &[(&str, &str)]) -> RepoResult<StageSeedOutcome> {
        let tenant = self.tenant.as_str();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM stages WHERE tenant_id = ?1;",
            [tenant],
            |row| row.get(0),
        )?;
        if existing > 0 {
            let stages = list_tenant_stages(&tx, tenant)?;
            tx.commit()?;
            return Ok(StageSeedOutcome {
                status: SeedStatus::AlreadyInitialized,
                stages,
            });
        }

        for (index, (name, color)) in defaults.iter().enumerate() {
            insert_stage(
                &tx,
                tenant,
                Uuid::new_v4(),
                name,
                Some(index as i64 + 1),
                Some(*color),
            )?;
        }
        let stages = list_tenant_stages(&tx, tenant)?;
        tx.commit()?;

        Ok(StageSeedOutcome {
            status: SeedStatus::Initialized,
            stages,
        })
    }

    fn reorder_stages(&self, ids: &[StageId]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (index, id) in ids.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE stages
                 SET position = ?1
                 WHERE id = ?2
                   AND tenant_id = ?3;",
                params![index as i64 + 1, id.to_string(), self.tenant.as_str()],
            )?;
            if changed == 0 {
                // Dropping `tx` rolls back positions written so far.
                return Err(stage_not_found(*id));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_stage(
    conn: &Connection,
    tenant: &str,
    id: StageId,
    name: &str,
    position: Option<i64>,
    color: Option<&str>,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO stages (
            id,
            tenant_id,
            name,
            position,
            color,
            created_at
        ) VALUES (
            ?1,
            ?2,
            ?3,
            COALESCE(?4, (SELECT COUNT(*) + 1 FROM stages WHERE tenant_id = ?2)),
            ?5,
            ?6
        );",
        params![id.to_string(), tenant, name, position, color, now_epoch_ms()],
    )?;
    Ok(())
}

fn load_stage(conn: &Connection, tenant: &str, id: StageId) -> RepoResult<Option<Stage>> {
    let mut stmt = conn.prepare(&format!(
        "{STAGE_SELECT_SQL}
         WHERE id = ?1
           AND tenant_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), tenant])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_stage_row(row)?));
    }
    Ok(None)
}

fn load_required_stage(conn: &Connection, tenant: &str, id: StageId) -> RepoResult<Stage> {
    load_stage(conn, tenant, id)?.ok_or_else(|| stage_not_found(id))
}

pub(crate) fn list_tenant_stages(conn: &Connection, tenant: &str) -> RepoResult<Vec<Stage>> {
    let mut stmt = conn.prepare(&format!(
        "{STAGE_SELECT_SQL}
         WHERE tenant_id = ?1
         ORDER BY position ASC, created_at ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([tenant])?;
    let mut stages = Vec::new();
    while let Some(row) = rows.next()? {
        stages.push(parse_stage_row(row)?);
    }
    Ok(stages)
}

fn parse_stage_row(row: &Row<'_>) -> RepoResult<Stage> {
    let id_text: String = row.get("id")?;
    Ok(Stage {
        id: parse_uuid(&id_text, "stages.id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        position: row.get("position")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
    })
}

fn stage_not_found(id: StageId) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY_STAGE,
        id,
    }
}
