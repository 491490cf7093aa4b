//! Contact use-case service.
//!
//! # Responsibility
//! - Validate contact input and forward CRUD to the repository.
//! - Provide pipeline transitions (`move_stage`) and lost/reactivate
//!   shorthands.
//! - Assemble a contact overview with recent interactions and open tasks.
//!
//! # Invariants
//! - `mark_lost`/`reactivate` write `is_active` and `lost_reason` together.

use crate::model::contact::{Contact, ContactId, ContactListQuery, ContactPatch, NewContact};
use crate::model::interaction::{Interaction, InteractionListQuery};
use crate::model::stage::StageId;
use crate::model::task::{Task, TaskListQuery};
use crate::repo::contact_repo::ContactRepository;
use crate::repo::interaction_repo::InteractionRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::ENTITY_CONTACT;
use crate::service::interaction_service::InteractionService;
use crate::service::task_service::TaskService;
use crate::service::{found, require_text, ServiceResult};
use log::info;
use serde::Serialize;

const OVERVIEW_INTERACTION_LIMIT: u32 = 10;

/// Contact with its recent touchpoints and open follow-ups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactOverview {
    pub contact: Contact,
    /// Newest first, at most 10.
    pub recent_interactions: Vec<Interaction>,
    /// Open tasks in task listing order.
    pub open_tasks: Vec<Task>,
}

/// Contact service facade over repository implementations.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one contact. Only `name` is required.
    pub fn create_contact(&self, input: &NewContact) -> ServiceResult<Contact> {
        let name = require_text(Some(input.name.as_str()), "name")?;
        let mut input = input.clone();
        input.name = name.to_string();

        let contact = self.repo.create_contact(&input)?;
        info!(
            "event=contact_create module=service status=ok tenant={} contact_id={} staged={}",
            self.repo.tenant(),
            contact.id,
            contact.stage_id.is_some()
        );
        Ok(contact)
    }

    /// Gets one contact, `NotFound` when absent for this tenant.
    pub fn get_contact(&self, id: ContactId) -> ServiceResult<Contact> {
        found(self.repo.get_contact(id)?, ENTITY_CONTACT, id)
    }

    /// Lists contacts newest first using the query filters.
    pub fn list_contacts(&self, query: &ContactListQuery) -> ServiceResult<Vec<Contact>> {
        Ok(self.repo.list_contacts(query)?)
    }

    /// Case-insensitive substring search. Blank text yields an empty list
    /// without touching the store.
    pub fn search_contacts(&self, text: &str, limit: Option<u32>) -> ServiceResult<Vec<Contact>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.search_contacts(text, limit)?)
    }

    /// Applies a partial update. A patched name must not be blank.
    pub fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> ServiceResult<Contact> {
        let mut patch = patch.clone();
        if let Some(name) = patch.name.as_deref() {
            patch.name = Some(require_text(Some(name), "name")?.to_string());
        }
        let contact = self.repo.update_contact(id, &patch)?;
        info!(
            "event=contact_update module=service status=ok tenant={} contact_id={}",
            self.repo.tenant(),
            id
        );
        Ok(contact)
    }

    /// Moves a contact into `stage_id`, refreshing `stage_entered_at` in
    /// the same write.
    pub fn move_stage(&self, id: ContactId, stage_id: StageId) -> ServiceResult<Contact> {
        let contact = self.repo.move_stage(id, Some(stage_id))?;
        info!(
            "event=contact_move_stage module=service status=ok tenant={} contact_id={} stage_id={}",
            self.repo.tenant(),
            id,
            stage_id
        );
        Ok(contact)
    }

    /// Takes a contact out of the pipeline (`stage_id = NULL`).
    pub fn clear_stage(&self, id: ContactId) -> ServiceResult<Contact> {
        Ok(self.repo.move_stage(id, None)?)
    }

    /// Marks a contact inactive with an optional reason.
    pub fn mark_lost(&self, id: ContactId, reason: Option<&str>) -> ServiceResult<Contact> {
        let reason = reason.map(str::trim).filter(|value| !value.is_empty());
        let contact = self.repo.set_active(id, false, reason)?;
        info!(
            "event=contact_mark_lost module=service status=ok tenant={} contact_id={}",
            self.repo.tenant(),
            id
        );
        Ok(contact)
    }

    /// Re-activates a contact and clears its lost reason.
    pub fn reactivate(&self, id: ContactId) -> ServiceResult<Contact> {
        let contact = self.repo.set_active(id, true, None)?;
        info!(
            "event=contact_reactivate module=service status=ok tenant={} contact_id={}",
            self.repo.tenant(),
            id
        );
        Ok(contact)
    }

    /// Deletes a contact together with its interactions and tasks.
    pub fn delete_contact(&self, id: ContactId) -> ServiceResult<()> {
        self.repo.delete_contact(id)?;
        info!(
            "event=contact_delete module=service status=ok tenant={} contact_id={}",
            self.repo.tenant(),
            id
        );
        Ok(())
    }

    /// Loads one contact with its newest interactions and open tasks.
    pub fn contact_overview<I, T>(
        &self,
        id: ContactId,
        interactions: &InteractionService<I>,
        tasks: &TaskService<T>,
    ) -> ServiceResult<ContactOverview>
    where
        I: InteractionRepository,
        T: TaskRepository,
    {
        let contact = self.get_contact(id)?;
        let recent_interactions = interactions.list_interactions(&InteractionListQuery {
            contact_id: Some(id),
            limit: Some(OVERVIEW_INTERACTION_LIMIT),
            ..InteractionListQuery::default()
        })?;
        let open_tasks = tasks.list_tasks(&TaskListQuery {
            contact_id: Some(id),
            completed: Some(false),
            ..TaskListQuery::default()
        })?;

        Ok(ContactOverview {
            contact,
            recent_interactions,
            open_tasks,
        })
    }
}
