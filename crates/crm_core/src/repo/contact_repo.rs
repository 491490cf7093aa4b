//! Contact repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist contacts for one tenant, with the joined stage display name.
//! - Own stage transitions and active/lost toggles as single-statement writes.
//!
//! # Invariants
//! - `stage_id` and `stage_entered_at` are always written by the same UPDATE,
//!   and every stage write moves `stage_entered_at` strictly forward.
//! - Search folds case with the Unicode-aware `casefold` SQL function.
//! - A referenced stage must belong to the same tenant.
//! - Deleting a contact cascades to interactions and tasks (FK cascade).

use super::{
    bool_to_int, decode_json, encode_json, ensure_connection_ready, normalize_list_limit,
    now_epoch_ms, parse_bool, parse_optional_uuid, parse_uuid, row_exists, RepoError, RepoResult,
    UpdateSet, ENTITY_CONTACT, ENTITY_STAGE,
};
use crate::model::contact::{
    normalize_tag, normalize_tags, Contact, ContactId, ContactListQuery, ContactPatch, NewContact,
    DEFAULT_CURRENCY,
};
use crate::db::register_sql_functions;
use crate::model::stage::StageId;
use crate::model::tenant::TenantId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const CONTACT_SELECT_SQL: &str = "SELECT
    c.id AS id,
    c.tenant_id AS tenant_id,
    c.name AS name,
    c.email AS email,
    c.phone AS phone,
    c.company AS company,
    c.role AS role,
    c.stage_id AS stage_id,
    s.name AS stage_name,
    c.stage_entered_at AS stage_entered_at,
    c.source AS source,
    c.source_detail AS source_detail,
    c.assigned_to AS assigned_to,
    c.tags AS tags,
    c.custom_fields AS custom_fields,
    c.deal_value AS deal_value,
    c.currency AS currency,
    c.is_active AS is_active,
    c.lost_reason AS lost_reason,
    c.created_at AS created_at,
    c.updated_at AS updated_at,
    c.last_contact_at AS last_contact_at
FROM contacts c
LEFT JOIN stages s ON s.id = c.stage_id";

/// New stage entry time: `now`, bumped past the previous entry when the
/// clock has not advanced since.
const STAGE_ENTERED_AT_EXPR: &str = "MAX(?, COALESCE(stage_entered_at, 0) + 1)";

const CONTACT_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "name",
    "email",
    "phone",
    "company",
    "role",
    "stage_id",
    "stage_entered_at",
    "source",
    "source_detail",
    "assigned_to",
    "tags",
    "custom_fields",
    "deal_value",
    "currency",
    "is_active",
    "lost_reason",
    "created_at",
    "updated_at",
    "last_contact_at",
];

/// Repository interface for contact operations.
pub trait ContactRepository {
    fn tenant(&self) -> &TenantId;
    fn create_contact(&self, input: &NewContact) -> RepoResult<Contact>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>>;
    /// Case-insensitive substring search over name, email, company and phone.
    fn search_contacts(&self, text: &str, limit: Option<u32>) -> RepoResult<Vec<Contact>>;
    fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> RepoResult<Contact>;
    /// Sets `stage_id` and refreshes `stage_entered_at` in one statement.
    fn move_stage(&self, id: ContactId, stage_id: Option<StageId>) -> RepoResult<Contact>;
    /// Writes `is_active` and `lost_reason` as a pair.
    fn set_active(
        &self,
        id: ContactId,
        is_active: bool,
        lost_reason: Option<&str>,
    ) -> RepoResult<Contact>;
    fn delete_contact(&self, id: ContactId) -> RepoResult<()>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
    tenant: TenantId,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Creates repository from a migrated connection bound to `tenant`.
    pub fn try_new(conn: &'conn Connection, tenant: TenantId) -> RepoResult<Self> {
        ensure_connection_ready(conn, "contacts", CONTACT_COLUMNS)?;
        register_sql_functions(conn)?;
        Ok(Self { conn, tenant })
    }

    fn ensure_stage_in_tenant(&self, stage_id: StageId) -> RepoResult<()> {
        if row_exists(self.conn, "stages", stage_id, self.tenant.as_str())? {
            return Ok(());
        }
        Err(RepoError::NotFound {
            entity: ENTITY_STAGE,
            id: stage_id,
        })
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    fn create_contact(&self, input: &NewContact) -> RepoResult<Contact> {
        if let Some(stage_id) = input.stage_id {
            self.ensure_stage_in_tenant(stage_id)?;
        }

        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        let tags = encode_json(&normalize_tags(&input.tags), "contacts.tags")?;
        let custom_fields = encode_json(&input.custom_fields, "contacts.custom_fields")?;
        let currency = input
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CURRENCY);

        self.conn.execute(
            "INSERT INTO contacts (
                id,
                tenant_id,
                name,
                email,
                phone,
                company,
                role,
                stage_id,
                stage_entered_at,
                source,
                source_detail,
                assigned_to,
                tags,
                custom_fields,
                deal_value,
                currency,
                is_active,
                lost_reason,
                created_at,
                updated_at,
                last_contact_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, 1, NULL, ?17, ?17, NULL);",
            params![
                id.to_string(),
                self.tenant.as_str(),
                input.name.as_str(),
                input.email.as_deref(),
                input.phone.as_deref(),
                input.company.as_deref(),
                input.role.as_deref(),
                input.stage_id.map(|value| value.to_string()),
                input.stage_id.map(|_| now),
                input.source.as_deref(),
                input.source_detail.as_deref(),
                input.assigned_to.as_deref(),
                tags,
                custom_fields,
                input.deal_value,
                currency,
                now,
            ],
        )?;

        load_required_contact(self.conn, self.tenant.as_str(), id)
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        load_contact(self.conn, self.tenant.as_str(), id)
    }

    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        let mut sql = format!("{CONTACT_SELECT_SQL} WHERE c.tenant_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(self.tenant.as_str().to_string())];

        if let Some(stage_id) = query.stage_id {
            sql.push_str(" AND c.stage_id = ?");
            bind_values.push(Value::Text(stage_id.to_string()));
        } else if query.unstaged {
            sql.push_str(" AND c.stage_id IS NULL");
        }

        if let Some(assigned_to) = query.assigned_to.as_ref() {
            sql.push_str(" AND c.assigned_to = ?");
            bind_values.push(Value::Text(assigned_to.clone()));
        }

        if let Some(source) = query.source.as_ref() {
            sql.push_str(" AND c.source = ?");
            bind_values.push(Value::Text(source.clone()));
        }

        if let Some(tag) = query.tag.as_deref().and_then(normalize_tag) {
            sql.push_str(" AND EXISTS (SELECT 1 FROM json_each(c.tags) WHERE json_each.value = ?)");
            bind_values.push(Value::Text(tag));
        }

        if let Some(is_active) = query.is_active {
            sql.push_str(" AND c.is_active = ?");
            bind_values.push(Value::Integer(bool_to_int(is_active)));
        }

        sql.push_str(" ORDER BY c.created_at DESC, c.id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_list_limit(query.limit))));

        query_contacts(self.conn, &sql, bind_values)
    }

    fn search_contacts(&self, text: &str, limit: Option<u32>) -> RepoResult<Vec<Contact>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(&trimmed.to_lowercase()));
        let sql = format!(
            "{CONTACT_SELECT_SQL}
             WHERE c.tenant_id = ?1
               AND (
                 casefold(c.name) LIKE ?2 ESCAPE '\\'
                 OR casefold(c.email) LIKE ?2 ESCAPE '\\'
                 OR casefold(c.company) LIKE ?2 ESCAPE '\\'
                 OR casefold(c.phone) LIKE ?2 ESCAPE '\\'
               )
             ORDER BY c.name COLLATE NOCASE ASC, c.id ASC
             LIMIT ?3;"
        );
        let bind_values = vec![
            Value::Text(self.tenant.as_str().to_string()),
            Value::Text(pattern),
            Value::Integer(i64::from(normalize_list_limit(limit))),
        ];

        query_contacts(self.conn, &sql, bind_values)
    }

    fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> RepoResult<Contact> {
        let now = now_epoch_ms();
        let mut set = UpdateSet::default();

        if let Some(name) = patch.name.as_ref() {
            set.push("name", name.clone());
        }
        if let Some(email) = patch.email.as_ref() {
            set.push("email", email.clone());
        }
        if let Some(phone) = patch.phone.as_ref() {
            set.push("phone", phone.clone());
        }
        if let Some(company) = patch.company.as_ref() {
            set.push("company", company.clone());
        }
        if let Some(role) = patch.role.as_ref() {
            set.push("role", role.clone());
        }
        if let Some(stage_id) = patch.stage_id {
            if let Some(stage_id) = stage_id {
                self.ensure_stage_in_tenant(stage_id)?;
            }
            set.push("stage_id", stage_id.map(|value| value.to_string()));
            set.push_expr("stage_entered_at", STAGE_ENTERED_AT_EXPR, now);
        }
        if let Some(source) = patch.source.as_ref() {
            set.push("source", source.clone());
        }
        if let Some(source_detail) = patch.source_detail.as_ref() {
            set.push("source_detail", source_detail.clone());
        }
        if let Some(assigned_to) = patch.assigned_to.as_ref() {
            set.push("assigned_to", assigned_to.clone());
        }
        if let Some(tags) = patch.tags.as_ref() {
            set.push("tags", encode_json(&normalize_tags(tags), "contacts.tags")?);
        }
        if let Some(custom_fields) = patch.custom_fields.as_ref() {
            set.push(
                "custom_fields",
                encode_json(custom_fields, "contacts.custom_fields")?,
            );
        }
        if let Some(deal_value) = patch.deal_value {
            set.push("deal_value", deal_value);
        }
        if let Some(currency) = patch.currency.as_ref() {
            set.push("currency", currency.clone());
        }
        if let Some(is_active) = patch.is_active {
            set.push("is_active", bool_to_int(is_active));
        }
        if let Some(lost_reason) = patch.lost_reason.as_ref() {
            set.push("lost_reason", lost_reason.clone());
        }

        if set.is_empty() {
            return load_required_contact(self.conn, self.tenant.as_str(), id);
        }
        set.push("updated_at", now);

        self.apply_update(id, set)
    }

    fn move_stage(&self, id: ContactId, stage_id: Option<StageId>) -> RepoResult<Contact> {
        if let Some(stage_id) = stage_id {
            self.ensure_stage_in_tenant(stage_id)?;
        }

        let now = now_epoch_ms();
        let changed = self.conn.execute(
            "UPDATE contacts
             SET stage_id = ?1,
                 stage_entered_at = MAX(?2, COALESCE(stage_entered_at, 0) + 1),
                 updated_at = ?2
             WHERE id = ?3
               AND tenant_id = ?4;",
            params![
                stage_id.map(|value| value.to_string()),
                now,
                id.to_string(),
                self.tenant.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(contact_not_found(id));
        }

        load_required_contact(self.conn, self.tenant.as_str(), id)
    }

    fn set_active(
        &self,
        id: ContactId,
        is_active: bool,
        lost_reason: Option<&str>,
    ) -> RepoResult<Contact> {
        let changed = self.conn.execute(
            "UPDATE contacts
             SET is_active = ?1,
                 lost_reason = ?2,
                 updated_at = ?3
             WHERE id = ?4
               AND tenant_id = ?5;",
            params![
                bool_to_int(is_active),
                lost_reason,
                now_epoch_ms(),
                id.to_string(),
                self.tenant.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(contact_not_found(id));
        }

        load_required_contact(self.conn, self.tenant.as_str(), id)
    }

    fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM contacts WHERE id = ?1 AND tenant_id = ?2;",
            params![id.to_string(), self.tenant.as_str()],
        )?;
        if changed == 0 {
            return Err(contact_not_found(id));
        }
        Ok(())
    }
}

impl SqliteContactRepository<'_> {
    fn apply_update(&self, id: ContactId, set: UpdateSet) -> RepoResult<Contact> {
        let (assignments, mut bind_values) = set.into_parts();
        bind_values.push(Value::Text(id.to_string()));
        bind_values.push(Value::Text(self.tenant.as_str().to_string()));

        let changed = self.conn.execute(
            &format!("UPDATE contacts SET {assignments} WHERE id = ? AND tenant_id = ?;"),
            params_from_iter(bind_values),
        )?;
        if changed == 0 {
            return Err(contact_not_found(id));
        }

        load_required_contact(self.conn, self.tenant.as_str(), id)
    }
}

fn load_contact(conn: &Connection, tenant: &str, id: ContactId) -> RepoResult<Option<Contact>> {
    let mut stmt = conn.prepare(&format!(
        "{CONTACT_SELECT_SQL}
         WHERE c.id = ?1
           AND c.tenant_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), tenant])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_contact_row(row)?));
    }
    Ok(None)
}

fn load_required_contact(conn: &Connection, tenant: &str, id: ContactId) -> RepoResult<Contact> {
    load_contact(conn, tenant, id)?.ok_or_else(|| contact_not_found(id))
}

fn query_contacts(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Contact>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut contacts = Vec::new();
    while let Some(row) = rows.next()? {
        contacts.push(parse_contact_row(row)?);
    }
    Ok(contacts)
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let id_text: String = row.get("id")?;
    let tags_text: String = row.get("tags")?;
    let custom_fields_text: String = row.get("custom_fields")?;

    Ok(Contact {
        id: parse_uuid(&id_text, "contacts.id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        company: row.get("company")?,
        role: row.get("role")?,
        stage_id: parse_optional_uuid(row.get("stage_id")?, "contacts.stage_id")?,
        stage_name: row.get("stage_name")?,
        stage_entered_at: row.get("stage_entered_at")?,
        source: row.get("source")?,
        source_detail: row.get("source_detail")?,
        assigned_to: row.get("assigned_to")?,
        tags: decode_json(&tags_text, "contacts.tags")?,
        custom_fields: decode_json(&custom_fields_text, "contacts.custom_fields")?,
        deal_value: row.get("deal_value")?,
        currency: row.get("currency")?,
        is_active: parse_bool(row.get("is_active")?, "contacts.is_active")?,
        lost_reason: row.get("lost_reason")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        last_contact_at: row.get("last_contact_at")?,
    })
}

/// Escapes `LIKE` wildcards so user text matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn contact_not_found(id: ContactId) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY_CONTACT,
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("acme"), "acme");
    }
}
