//! Pipeline stage model.
//!
//! # Invariants
//! - `position` is the ordering key within one tenant; listing sorts by it.
//! - Positions are not unique-constrained by the store.

use super::double_option;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StageId = Uuid;

/// Named, ordered step in a sales pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub tenant_id: String,
    pub name: String,
    pub position: i64,
    pub color: Option<String>,
    pub created_at: i64,
}

/// Input for creating one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewStage {
    pub name: String,
    /// Next free position (`count + 1`) when absent.
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewStage {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial stage update. Unknown keys are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StagePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

impl StagePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.position.is_none() && self.color.is_none()
    }
}

/// Result flag of default stage seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStatus {
    /// Six default stages were created.
    Initialized,
    /// The tenant already had stages; nothing was written.
    AlreadyInitialized,
}

/// Outcome of `initialize_default_stages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSeedOutcome {
    pub status: SeedStatus,
    pub stages: Vec<Stage>,
}

/// Default pipeline seeded for a fresh tenant: `(name, color)` in order.
pub const DEFAULT_STAGES: [(&str, &str); 6] = [
    ("Lead", "#6B7280"),
    ("Contacted", "#3B82F6"),
    ("Qualified", "#8B5CF6"),
    ("Proposal", "#F59E0B"),
    ("Won", "#10B981"),
    ("Lost", "#EF4444"),
];
