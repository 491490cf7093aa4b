//! Domain facade over the tenant-scoped repositories.
//!
//! # Responsibility
//! - Validate required inputs before any store call.
//! - Apply defaults and convenience presets, then forward to repositories.
//! - Translate "no row" outcomes into `NotFound`.
//!
//! # Invariants
//! - Services remain storage-agnostic; they only see repository traits.
//! - Store failures are surfaced unchanged and never retried here.

pub mod contact_service;
pub mod interaction_service;
pub mod stage_service;
pub mod stats_service;
pub mod task_service;

use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy exposed to callers of the CRM core.
#[derive(Debug)]
pub enum ServiceError {
    /// Required input absent or blank; raised before any store call.
    MissingField(&'static str),
    /// Addressed row does not exist for the caller's tenant.
    NotFound { entity: &'static str, id: Uuid },
    /// Underlying store failure, message passed through unchanged.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

/// Returns the trimmed value, or `MissingField(field)` when absent/blank.
pub(crate) fn require_text<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> ServiceResult<&'a str> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ServiceError::MissingField(field)),
    }
}

/// Maps a repository `Option` read into `NotFound`.
pub(crate) fn found<T>(value: Option<T>, entity: &'static str, id: Uuid) -> ServiceResult<T> {
    value.ok_or(ServiceError::NotFound { entity, id })
}

#[cfg(test)]
mod tests {
    use super::{require_text, ServiceError};
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text(Some("  Ada "), "name").unwrap(), "Ada");
        assert!(matches!(
            require_text(Some("   "), "name"),
            Err(ServiceError::MissingField("name"))
        ));
        assert!(matches!(
            require_text(None, "title"),
            Err(ServiceError::MissingField("title"))
        ));
    }

    #[test]
    fn repo_not_found_maps_to_service_not_found() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(RepoError::NotFound {
            entity: "contact",
            id,
        });
        assert!(matches!(err, ServiceError::NotFound { entity: "contact", id: found } if found == id));
        assert_eq!(err.to_string(), format!("contact not found: {id}"));
    }
}
