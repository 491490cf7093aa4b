//! Tenant isolation key.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "default";

/// Isolation key partitioning all CRM data.
///
/// Repositories are bound to one `TenantId` at construction and stamp or
/// filter every statement with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Builds a tenant id from user input.
    ///
    /// Returns `None` when the value is blank after trimming.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
