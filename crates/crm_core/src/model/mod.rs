//! Domain model for the tenant-scoped sales pipeline.
//!
//! # Responsibility
//! - Define the records returned by repositories and services.
//! - Define the input field bags (`New*`) and partial patches (`*Patch`).
//!
//! # Invariants
//! - Every persisted record carries the `tenant_id` it was written under.
//! - Timestamps are Unix epoch milliseconds.
//! - Patch fields left as `None` are never written.

pub mod contact;
pub mod interaction;
pub mod stage;
pub mod task;
pub mod tenant;

use serde::{Deserialize, Deserializer};

/// Free-form key/value container for `custom_fields` and `metadata`.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Distinguishes "field absent" from "field explicitly null" in patches.
///
/// Absent keys deserialize to `None` through `#[serde(default)]`; present
/// keys (including `null`) land here as `Some(..)`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
