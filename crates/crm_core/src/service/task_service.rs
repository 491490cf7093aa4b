//! Task use-case service.
//!
//! # Responsibility
//! - Validate task input and forward to the repository.
//! - Drive the open/completed lifecycle and overdue listing.

use crate::model::task::{NewTask, Task, TaskId, TaskListQuery, TaskPatch};
use crate::repo::task_repo::TaskRepository;
use crate::repo::{now_epoch_ms, ENTITY_TASK};
use crate::service::{found, require_text, ServiceResult};
use log::info;

/// Task service facade over repository implementations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one open task. Only `title` is required.
    pub fn add_task(&self, input: &NewTask) -> ServiceResult<Task> {
        let title = require_text(Some(input.title.as_str()), "title")?;
        let mut input = input.clone();
        input.title = title.to_string();

        let task = self.repo.create_task(&input)?;
        info!(
            "event=task_add module=service status=ok tenant={} task_id={} priority={}",
            self.repo.tenant(),
            task.id,
            task.priority.as_str()
        );
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Task> {
        found(self.repo.get_task(id)?, ENTITY_TASK, id)
    }

    /// Lists tasks: open first, earliest due first, undated last.
    pub fn list_tasks(&self, query: &TaskListQuery) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_tasks(query)?)
    }

    /// Open tasks whose due time has already passed.
    pub fn overdue_tasks(&self, limit: Option<u32>) -> ServiceResult<Vec<Task>> {
        self.list_tasks(&TaskListQuery {
            completed: Some(false),
            due_before: Some(now_epoch_ms()),
            limit,
            ..TaskListQuery::default()
        })
    }

    /// Applies a partial update. A patched title must not be blank.
    pub fn update_task(&self, id: TaskId, patch: &TaskPatch) -> ServiceResult<Task> {
        let mut patch = patch.clone();
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(require_text(Some(title), "title")?.to_string());
        }
        Ok(self.repo.update_task(id, &patch)?)
    }

    /// Marks a task done and stamps `completed_at`.
    pub fn complete_task(&self, id: TaskId) -> ServiceResult<Task> {
        let task = self.repo.set_completed(id, true)?;
        info!(
            "event=task_complete module=service status=ok tenant={} task_id={}",
            self.repo.tenant(),
            id
        );
        Ok(task)
    }

    /// Re-opens a task and clears `completed_at`.
    pub fn uncomplete_task(&self, id: TaskId) -> ServiceResult<Task> {
        let task = self.repo.set_completed(id, false)?;
        info!(
            "event=task_uncomplete module=service status=ok tenant={} task_id={}",
            self.repo.tenant(),
            id
        );
        Ok(task)
    }

    pub fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        self.repo.delete_task(id)?;
        info!(
            "event=task_delete module=service status=ok tenant={} task_id={}",
            self.repo.tenant(),
            id
        );
        Ok(())
    }
}
