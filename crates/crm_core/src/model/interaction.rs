//! Interaction (touchpoint) model.
//!
//! # Invariants
//! - `kind` is free-form (`call`, `email`, `meeting`, `note`, ...); the
//!   store does not constrain it.
//! - Creating an interaction refreshes the parent contact's
//!   `last_contact_at`.

use super::contact::ContactId;
use super::FieldMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InteractionId = Uuid;

/// Creator type applied when none is supplied.
pub const DEFAULT_CREATED_BY_TYPE: &str = "agent";

/// Kind strings used by the logging shorthands.
pub const KIND_NOTE: &str = "note";
pub const KIND_CALL: &str = "call";
pub const KIND_EMAIL: &str = "email";

/// Metadata key written by `log_call` when a duration is supplied.
pub const CALL_DURATION_KEY: &str = "duration_minutes";

/// Logged touchpoint tied to one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub tenant_id: String,
    pub contact_id: ContactId,
    /// Joined from `contacts.name`; read-only.
    pub contact_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub created_by: String,
    pub created_by_type: String,
    pub scheduled_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub metadata: FieldMap,
    pub created_at: i64,
}

/// Input for logging one interaction.
///
/// `contact_id`, `kind` and `created_by` are required; they are optional
/// here so the facade can report exactly which one is missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewInteraction {
    pub contact_id: Option<ContactId>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub created_by: Option<String>,
    /// Falls back to [`DEFAULT_CREATED_BY_TYPE`].
    pub created_by_type: Option<String>,
    pub scheduled_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub metadata: FieldMap,
}

/// Filters for interaction listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionListQuery {
    pub contact_id: Option<ContactId>,
    /// Exact match on the interaction type string.
    pub kind: Option<String>,
    /// Defaults to 50, clamps to 500.
    pub limit: Option<u32>,
}
