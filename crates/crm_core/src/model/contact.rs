//! Contact model.
//!
//! # Responsibility
//! - Define the contact record with its pipeline position and deal value.
//! - Normalize tag sets before persistence.
//!
//! # Invariants
//! - `stage_entered_at` changes whenever `stage_id` changes.
//! - `is_active == false` goes together with `lost_reason` by convention;
//!   the store does not enforce the pairing.

use super::double_option;
use super::stage::StageId;
use super::FieldMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type ContactId = Uuid;

/// Currency applied when a contact is created without one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Person or organization tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub stage_id: Option<StageId>,
    /// Joined from `stages.name`; read-only.
    pub stage_name: Option<String>,
    pub stage_entered_at: Option<i64>,
    pub source: Option<String>,
    pub source_detail: Option<String>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub custom_fields: FieldMap,
    pub deal_value: Option<f64>,
    pub currency: String,
    pub is_active: bool,
    pub lost_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_contact_at: Option<i64>,
}

/// Input for creating one contact. Only `name` is required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub stage_id: Option<StageId>,
    pub source: Option<String>,
    pub source_detail: Option<String>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub custom_fields: FieldMap,
    pub deal_value: Option<f64>,
    /// Falls back to [`DEFAULT_CURRENCY`].
    pub currency: Option<String>,
}

impl NewContact {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial contact update.
///
/// Nullable columns use `Option<Option<T>>`: outer `None` leaves the column
/// untouched, `Some(None)` clears it. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub role: Option<Option<String>>,
    /// Also refreshes `stage_entered_at` when present.
    #[serde(default, deserialize_with = "double_option")]
    pub stage_id: Option<Option<StageId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source_detail: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub custom_fields: Option<FieldMap>,
    #[serde(default, deserialize_with = "double_option")]
    pub deal_value: Option<Option<f64>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub lost_reason: Option<Option<String>>,
}

/// Filters for contact listing. All filters are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactListQuery {
    pub stage_id: Option<StageId>,
    /// Only contacts without a stage. Ignored when `stage_id` is set.
    pub unstaged: bool,
    pub assigned_to: Option<String>,
    pub source: Option<String>,
    /// Exact membership in the normalized tag set.
    pub tag: Option<String>,
    pub is_active: Option<bool>,
    /// Defaults to 50, clamps to 500.
    pub limit: Option<u32>,
}

/// Normalizes one tag: trimmed and lowercased, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts a tag set.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}
