//! Interaction repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist logged touchpoints for one tenant.
//! - Refresh the parent contact's `last_contact_at` on every insert.
//!
//! # Invariants
//! - Insert and `last_contact_at` refresh commit in the same transaction.
//! - The parent contact must belong to the bound tenant.

use super::{
    decode_json, encode_json, ensure_connection_ready, normalize_list_limit, now_epoch_ms,
    parse_uuid, row_exists, RepoError, RepoResult, ENTITY_CONTACT, ENTITY_INTERACTION,
};
use crate::model::contact::ContactId;
use crate::model::interaction::{
    Interaction, InteractionId, InteractionListQuery, DEFAULT_CREATED_BY_TYPE,
};
use crate::model::tenant::TenantId;
use crate::model::FieldMap;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const INTERACTION_SELECT_SQL: &str = "SELECT
    i.id AS id,
    i.tenant_id AS tenant_id,
    i.contact_id AS contact_id,
    c.name AS contact_name,
    i.type AS type,
    i.subject AS subject,
    i.content AS content,
    i.created_by AS created_by,
    i.created_by_type AS created_by_type,
    i.scheduled_at AS scheduled_at,
    i.completed_at AS completed_at,
    i.metadata AS metadata,
    i.created_at AS created_at
FROM interactions i
LEFT JOIN contacts c ON c.id = i.contact_id";

const INTERACTION_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "contact_id",
    "type",
    "subject",
    "content",
    "created_by",
    "created_by_type",
    "scheduled_at",
    "completed_at",
    "metadata",
    "created_at",
];

/// Validated interaction write, built by the service facade.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecordInput<'a> {
    pub contact_id: ContactId,
    pub kind: &'a str,
    pub subject: Option<&'a str>,
    pub content: Option<&'a str>,
    pub created_by: &'a str,
    pub created_by_type: Option<&'a str>,
    pub scheduled_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub metadata: &'a FieldMap,
}

/// Repository interface for interaction operations.
pub trait InteractionRepository {
    fn tenant(&self) -> &TenantId;
    /// Inserts one interaction and touches the contact's `last_contact_at`.
    fn create_interaction(&self, input: &InteractionRecordInput<'_>) -> RepoResult<Interaction>;
    fn get_interaction(&self, id: InteractionId) -> RepoResult<Option<Interaction>>;
    fn list_interactions(&self, query: &InteractionListQuery) -> RepoResult<Vec<Interaction>>;
    fn delete_interaction(&self, id: InteractionId) -> RepoResult<()>;
}

/// SQLite-backed interaction repository.
pub struct SqliteInteractionRepository<'conn> {
    conn: &'conn Connection,
    tenant: TenantId,
}

impl<'conn> SqliteInteractionRepository<'conn> {
    /// Creates repository from a migrated connection bound to `tenant`.
    pub fn try_new(conn: &'conn Connection, tenant: TenantId) -> RepoResult<Self> {
        ensure_connection_ready(conn, "interactions", INTERACTION_COLUMNS)?;
        Ok(Self { conn, tenant })
    }
}

impl InteractionRepository for SqliteInteractionRepository<'_> {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    fn create_interaction(&self, input: &InteractionRecordInput<'_>) -> RepoResult<Interaction> {
        let tenant = self.tenant.as_str();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "contacts", input.contact_id, tenant)? {
            return Err(RepoError::NotFound {
                entity: ENTITY_CONTACT,
                id: input.contact_id,
            });
        }

        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        let metadata = encode_json(input.metadata, "interactions.metadata")?;
        tx.execute(
            "INSERT INTO interactions (
                id,
                tenant_id,
                contact_id,
                type,
                subject,
                content,
                created_by,
                created_by_type,
                scheduled_at,
                completed_at,
                metadata,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                id.to_string(),
                tenant,
                input.contact_id.to_string(),
                input.kind,
                input.subject,
                input.content,
                input.created_by,
                input.created_by_type.unwrap_or(DEFAULT_CREATED_BY_TYPE),
                input.scheduled_at,
                input.completed_at,
                metadata,
                now,
            ],
        )?;

        tx.execute(
            "UPDATE contacts
             SET last_contact_at = ?1,
                 updated_at = ?1
             WHERE id = ?2
               AND tenant_id = ?3;",
            params![now, input.contact_id.to_string(), tenant],
        )?;

        let created = load_interaction(&tx, tenant, id)?.ok_or_else(|| interaction_not_found(id))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_interaction(&self, id: InteractionId) -> RepoResult<Option<Interaction>> {
        load_interaction(self.conn, self.tenant.as_str(), id)
    }

    fn list_interactions(&self, query: &InteractionListQuery) -> RepoResult<Vec<Interaction>> {
        let mut sql = format!("{INTERACTION_SELECT_SQL} WHERE i.tenant_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(self.tenant.as_str().to_string())];

        if let Some(contact_id) = query.contact_id {
            sql.push_str(" AND i.contact_id = ?");
            bind_values.push(Value::Text(contact_id.to_string()));
        }

        if let Some(kind) = query.kind.as_ref() {
            sql.push_str(" AND i.type = ?");
            bind_values.push(Value::Text(kind.clone()));
        }

        sql.push_str(" ORDER BY i.created_at DESC, i.id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_list_limit(query.limit))));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut interactions = Vec::new();
        while let Some(row) = rows.next()? {
            interactions.push(parse_interaction_row(row)?);
        }
        Ok(interactions)
    }

    fn delete_interaction(&self, id: InteractionId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM interactions WHERE id = ?1 AND tenant_id = ?2;",
            params![id.to_string(), self.tenant.as_str()],
        )?;
        if changed == 0 {
            return Err(interaction_not_found(id));
        }
        Ok(())
    }
}

fn load_interaction(
    conn: &Connection,
    tenant: &str,
    id: InteractionId,
) -> RepoResult<Option<Interaction>> {
    let mut stmt = conn.prepare(&format!(
        "{INTERACTION_SELECT_SQL}
         WHERE i.id = ?1
           AND i.tenant_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), tenant])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_interaction_row(row)?));
    }
    Ok(None)
}

fn parse_interaction_row(row: &Row<'_>) -> RepoResult<Interaction> {
    let id_text: String = row.get("id")?;
    let contact_text: String = row.get("contact_id")?;
    let metadata_text: String = row.get("metadata")?;

    Ok(Interaction {
        id: parse_uuid(&id_text, "interactions.id")?,
        tenant_id: row.get("tenant_id")?,
        contact_id: parse_uuid(&contact_text, "interactions.contact_id")?,
        contact_name: row.get("contact_name")?,
        kind: row.get("type")?,
        subject: row.get("subject")?,
        content: row.get("content")?,
        created_by: row.get("created_by")?,
        created_by_type: row.get("created_by_type")?,
        scheduled_at: row.get("scheduled_at")?,
        completed_at: row.get("completed_at")?,
        metadata: decode_json(&metadata_text, "interactions.metadata")?,
        created_at: row.get("created_at")?,
    })
}

fn interaction_not_found(id: InteractionId) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY_INTERACTION,
        id,
    }
}
