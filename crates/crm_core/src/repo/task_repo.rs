//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist follow-up tasks for one tenant.
//! - Keep `completed` and `completed_at` paired on every write.
//!
//! # Invariants
//! - Listing order: open before completed, then `due_at ASC` with NULL
//!   due dates last, then `created_at DESC, id ASC`.
//! - A referenced contact must belong to the bound tenant.

use super::{
    bool_to_int, ensure_connection_ready, normalize_list_limit, now_epoch_ms, parse_bool,
    parse_optional_uuid, parse_uuid, row_exists, RepoError, RepoResult, UpdateSet,
    ENTITY_CONTACT, ENTITY_TASK,
};
use crate::model::contact::ContactId;
use crate::model::task::{NewTask, Task, TaskId, TaskListQuery, TaskPatch, TaskPriority};
use crate::model::tenant::TenantId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    t.id AS id,
    t.tenant_id AS tenant_id,
    t.contact_id AS contact_id,
    c.name AS contact_name,
    t.title AS title,
    t.description AS description,
    t.due_at AS due_at,
    t.assigned_to AS assigned_to,
    t.priority AS priority,
    t.completed AS completed,
    t.completed_at AS completed_at,
    t.created_at AS created_at,
    t.updated_at AS updated_at
FROM tasks t
LEFT JOIN contacts c ON c.id = t.contact_id";

const TASK_ORDER_SQL: &str =
    " ORDER BY t.completed ASC, (t.due_at IS NULL) ASC, t.due_at ASC, t.created_at DESC, t.id ASC";

const TASK_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "contact_id",
    "title",
    "description",
    "due_at",
    "assigned_to",
    "priority",
    "completed",
    "completed_at",
    "created_at",
    "updated_at",
];

/// Repository interface for task operations.
pub trait TaskRepository {
    fn tenant(&self) -> &TenantId;
    fn create_task(&self, input: &NewTask) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> RepoResult<Task>;
    /// Sets `completed` and stamps or clears `completed_at` in one statement.
    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
    tenant: TenantId,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from a migrated connection bound to `tenant`.
    pub fn try_new(conn: &'conn Connection, tenant: TenantId) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tasks", TASK_COLUMNS)?;
        Ok(Self { conn, tenant })
    }

    fn ensure_contact_in_tenant(&self, contact_id: ContactId) -> RepoResult<()> {
        if row_exists(self.conn, "contacts", contact_id, self.tenant.as_str())? {
            return Ok(());
        }
        Err(RepoError::NotFound {
            entity: ENTITY_CONTACT,
            id: contact_id,
        })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    fn create_task(&self, input: &NewTask) -> RepoResult<Task> {
        if let Some(contact_id) = input.contact_id {
            self.ensure_contact_in_tenant(contact_id)?;
        }

        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO tasks (
                id,
                tenant_id,
                contact_id,
                title,
                description,
                due_at,
                assigned_to,
                priority,
                completed,
                completed_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, ?9, ?9);",
            params![
                id.to_string(),
                self.tenant.as_str(),
                input.contact_id.map(|value| value.to_string()),
                input.title.as_str(),
                input.description.as_deref(),
                input.due_at,
                input.assigned_to.as_deref(),
                input.priority.unwrap_or_default().as_str(),
                now,
            ],
        )?;

        load_required_task(self.conn, self.tenant.as_str(), id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        load_task(self.conn, self.tenant.as_str(), id)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE t.tenant_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(self.tenant.as_str().to_string())];

        if let Some(contact_id) = query.contact_id {
            sql.push_str(" AND t.contact_id = ?");
            bind_values.push(Value::Text(contact_id.to_string()));
        }

        if let Some(assigned_to) = query.assigned_to.as_ref() {
            sql.push_str(" AND t.assigned_to = ?");
            bind_values.push(Value::Text(assigned_to.clone()));
        }

        if let Some(completed) = query.completed {
            sql.push_str(" AND t.completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        if let Some(due_before) = query.due_before {
            sql.push_str(" AND t.due_at IS NOT NULL AND t.due_at < ?");
            bind_values.push(Value::Integer(due_before));
        }

        if let Some(priority) = query.priority {
            sql.push_str(" AND t.priority = ?");
            bind_values.push(Value::Text(priority.as_str().to_string()));
        }

        sql.push_str(TASK_ORDER_SQL);
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_list_limit(query.limit))));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> RepoResult<Task> {
        let mut set = UpdateSet::default();
        if let Some(title) = patch.title.as_ref() {
            set.push("title", title.clone());
        }
        if let Some(description) = patch.description.as_ref() {
            set.push("description", description.clone());
        }
        if let Some(due_at) = patch.due_at {
            set.push("due_at", due_at);
        }
        if let Some(assigned_to) = patch.assigned_to.as_ref() {
            set.push("assigned_to", assigned_to.clone());
        }
        if let Some(priority) = patch.priority {
            set.push("priority", priority.as_str().to_string());
        }
        if let Some(contact_id) = patch.contact_id {
            if let Some(contact_id) = contact_id {
                self.ensure_contact_in_tenant(contact_id)?;
            }
            set.push("contact_id", contact_id.map(|value| value.to_string()));
        }

        if set.is_empty() {
            return load_required_task(self.conn, self.tenant.as_str(), id);
        }
        set.push("updated_at", now_epoch_ms());

        let (assignments, mut bind_values) = set.into_parts();
        bind_values.push(Value::Text(id.to_string()));
        bind_values.push(Value::Text(self.tenant.as_str().to_string()));
        let changed = self.conn.execute(
            &format!("UPDATE tasks SET {assignments} WHERE id = ? AND tenant_id = ?;"),
            params_from_iter(bind_values),
        )?;
        if changed == 0 {
            return Err(task_not_found(id));
        }

        load_required_task(self.conn, self.tenant.as_str(), id)
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task> {
        let now = now_epoch_ms();
        let completed_at = if completed { Some(now) } else { None };
        let changed = self.conn.execute(
            "UPDATE tasks
             SET completed = ?1,
                 completed_at = ?2,
                 updated_at = ?3
             WHERE id = ?4
               AND tenant_id = ?5;",
            params![
                bool_to_int(completed),
                completed_at,
                now,
                id.to_string(),
                self.tenant.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(task_not_found(id));
        }

        load_required_task(self.conn, self.tenant.as_str(), id)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND tenant_id = ?2;",
            params![id.to_string(), self.tenant.as_str()],
        )?;
        if changed == 0 {
            return Err(task_not_found(id));
        }
        Ok(())
    }
}

fn load_task(conn: &Connection, tenant: &str, id: TaskId) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE t.id = ?1
           AND t.tenant_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), tenant])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

fn load_required_task(conn: &Connection, tenant: &str, id: TaskId) -> RepoResult<Task> {
    load_task(conn, tenant, id)?.ok_or_else(|| task_not_found(id))
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;

    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        tenant_id: row.get("tenant_id")?,
        contact_id: parse_optional_uuid(row.get("contact_id")?, "tasks.contact_id")?,
        contact_name: row.get("contact_name")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_at: row.get("due_at")?,
        assigned_to: row.get("assigned_to")?,
        priority,
        completed: parse_bool(row.get("completed")?, "tasks.completed")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn task_not_found(id: TaskId) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY_TASK,
        id,
    }
}
