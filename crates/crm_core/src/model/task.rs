//! Follow-up task model.
//!
//! # Invariants
//! - Lifecycle is open -> completed -> open; `completed_at` is set and
//!   cleared together with `completed`.

use super::contact::ContactId;
use super::double_option;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Task urgency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Action item, optionally tied to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub tenant_id: String,
    pub contact_id: Option<ContactId>,
    /// Joined from `contacts.name`; read-only.
    pub contact_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<i64>,
    pub assigned_to: Option<String>,
    pub priority: TaskPriority,
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Returns whether the task is open and past its due time.
    pub fn is_overdue(&self, now_epoch_ms: i64) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now_epoch_ms)
    }
}

/// Input for creating one task. Only `title` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewTask {
    pub title: String,
    pub contact_id: Option<ContactId>,
    pub description: Option<String>,
    pub due_at: Option<i64>,
    pub assigned_to: Option<String>,
    /// Falls back to [`TaskPriority::Medium`].
    pub priority: Option<TaskPriority>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial task update. Completion goes through `complete_task` /
/// `uncomplete_task` so the flag and timestamp stay paired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<ContactId>>,
}

/// Filters for task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub contact_id: Option<ContactId>,
    pub assigned_to: Option<String>,
    /// `Some(false)` lists open tasks only.
    pub completed: Option<bool>,
    /// Only tasks due strictly before this epoch-ms bound.
    pub due_before: Option<i64>,
    pub priority: Option<TaskPriority>,
    /// Defaults to 50, clamps to 500.
    pub limit: Option<u32>,
}
