//! Interaction use-case service.
//!
//! # Responsibility
//! - Validate required interaction fields before any store call.
//! - Provide note/call/email logging shorthands.
//!
//! # Invariants
//! - Validation order is `contact_id`, `type`, then `created_by`.
//! - A failed validation performs no write.

use crate::model::contact::ContactId;
use crate::model::interaction::{
    Interaction, InteractionId, InteractionListQuery, NewInteraction, CALL_DURATION_KEY,
    KIND_CALL, KIND_EMAIL, KIND_NOTE,
};
use crate::model::FieldMap;
use crate::repo::interaction_repo::{InteractionRecordInput, InteractionRepository};
use crate::repo::ENTITY_INTERACTION;
use crate::service::{found, require_text, ServiceError, ServiceResult};
use log::info;

/// Interaction service facade over repository implementations.
pub struct InteractionService<R: InteractionRepository> {
    repo: R,
}

impl<R: InteractionRepository> InteractionService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Logs one interaction and refreshes the contact's `last_contact_at`.
    pub fn add_interaction(&self, input: &NewInteraction) -> ServiceResult<Interaction> {
        let contact_id = input
            .contact_id
            .ok_or(ServiceError::MissingField("contact_id"))?;
        let kind = require_text(input.kind.as_deref(), "type")?;
        let created_by = require_text(input.created_by.as_deref(), "created_by")?;
        let created_by_type = input
            .created_by_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let record = InteractionRecordInput {
            contact_id,
            kind,
            subject: input.subject.as_deref(),
            content: input.content.as_deref(),
            created_by,
            created_by_type,
            scheduled_at: input.scheduled_at,
            completed_at: input.completed_at,
            metadata: &input.metadata,
        };
        let interaction = self.repo.create_interaction(&record)?;
        info!(
            "event=interaction_add module=service status=ok tenant={} interaction_id={} contact_id={} type={}",
            self.repo.tenant(),
            interaction.id,
            contact_id,
            interaction.kind
        );
        Ok(interaction)
    }

    /// Logs a `note` with `content`.
    pub fn add_note(
        &self,
        contact_id: ContactId,
        content: &str,
        created_by: &str,
    ) -> ServiceResult<Interaction> {
        self.add_interaction(&NewInteraction {
            contact_id: Some(contact_id),
            kind: Some(KIND_NOTE.to_string()),
            content: Some(content.to_string()),
            created_by: Some(created_by.to_string()),
            ..NewInteraction::default()
        })
    }

    /// Logs a `call`. A supplied duration is stored in metadata under
    /// `duration_minutes`.
    pub fn log_call(
        &self,
        contact_id: ContactId,
        summary: &str,
        created_by: &str,
        duration_minutes: Option<u32>,
    ) -> ServiceResult<Interaction> {
        let mut metadata = FieldMap::new();
        if let Some(minutes) = duration_minutes {
            metadata.insert(CALL_DURATION_KEY.to_string(), minutes.into());
        }
        self.add_interaction(&NewInteraction {
            contact_id: Some(contact_id),
            kind: Some(KIND_CALL.to_string()),
            content: Some(summary.to_string()),
            created_by: Some(created_by.to_string()),
            metadata,
            ..NewInteraction::default()
        })
    }

    /// Logs an `email` with `subject` and optional body.
    pub fn log_email(
        &self,
        contact_id: ContactId,
        subject: &str,
        body: Option<&str>,
        created_by: &str,
    ) -> ServiceResult<Interaction> {
        self.add_interaction(&NewInteraction {
            contact_id: Some(contact_id),
            kind: Some(KIND_EMAIL.to_string()),
            subject: Some(subject.to_string()),
            content: body.map(str::to_string),
            created_by: Some(created_by.to_string()),
            ..NewInteraction::default()
        })
    }

    pub fn get_interaction(&self, id: InteractionId) -> ServiceResult<Interaction> {
        found(self.repo.get_interaction(id)?, ENTITY_INTERACTION, id)
    }

    /// Lists interactions newest first.
    pub fn list_interactions(
        &self,
        query: &InteractionListQuery,
    ) -> ServiceResult<Vec<Interaction>> {
        Ok(self.repo.list_interactions(query)?)
    }

    pub fn delete_interaction(&self, id: InteractionId) -> ServiceResult<()> {
        self.repo.delete_interaction(id)?;
        info!(
            "event=interaction_delete module=service status=ok tenant={} interaction_id={}",
            self.repo.tenant(),
            id
        );
        Ok(())
    }
}
