//! Pipeline stage use-case service.
//!
//! # Responsibility
//! - Validate stage names and forward stage CRUD to the repository.
//! - Seed the default pipeline once per tenant.
//! - Rewrite stage order from a caller-supplied id list.

use crate::model::stage::{
    NewStage, Stage, StageId, StagePatch, StageSeedOutcome, DEFAULT_STAGES,
};
use crate::repo::stage_repo::StageRepository;
use crate::repo::ENTITY_STAGE;
use crate::service::{found, require_text, ServiceResult};
use log::info;

/// Stage service facade over repository implementations.
pub struct StageService<R: StageRepository> {
    repo: R,
}

impl<R: StageRepository> StageService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one stage. Without a position the stage is appended at
    /// `count + 1`.
    pub fn create_stage(&self, input: &NewStage) -> ServiceResult<Stage> {
        let name = require_text(Some(input.name.as_str()), "name")?;
        let color = input
            .color
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let stage = self.repo.create_stage(name, input.position, color)?;
        info!(
            "event=stage_create module=service status=ok tenant={} stage_id={} position={}",
            self.repo.tenant(),
            stage.id,
            stage.position
        );
        Ok(stage)
    }

    /// Gets one stage, `NotFound` when absent for this tenant.
    pub fn get_stage(&self, id: StageId) -> ServiceResult<Stage> {
        found(self.repo.get_stage(id)?, ENTITY_STAGE, id)
    }

    /// Lists stages in position order.
    pub fn list_stages(&self) -> ServiceResult<Vec<Stage>> {
        Ok(self.repo.list_stages()?)
    }

    /// Applies a partial update. A patched name must not be blank.
    pub fn update_stage(&self, id: StageId, patch: &StagePatch) -> ServiceResult<Stage> {
        let mut patch = patch.clone();
        if let Some(name) = patch.name.as_deref() {
            patch.name = Some(require_text(Some(name), "name")?.to_string());
        }
        Ok(self.repo.update_stage(id, &patch)?)
    }

    /// Deletes one stage; contacts in it become unstaged.
    pub fn delete_stage(&self, id: StageId) -> ServiceResult<()> {
        self.repo.delete_stage(id)?;
        info!(
            "event=stage_delete module=service status=ok tenant={} stage_id={}",
            self.repo.tenant(),
            id
        );
        Ok(())
    }

    /// Seeds the six default stages unless the tenant already has stages.
    ///
    /// The returned status tells a fresh seed apart from an untouched,
    /// already-initialized tenant.
    pub fn initialize_default_stages(&self) -> ServiceResult<StageSeedOutcome> {
        let outcome = self.repo.seed_stages(&DEFAULT_STAGES)?;
        info!(
            "event=stage_seed module=service status=ok tenant={} outcome={:?} stages={}",
            self.repo.tenant(),
            outcome.status,
            outcome.stages.len()
        );
        Ok(outcome)
    }

    /// Sets `position = index + 1` for each id, then returns the new order.
    ///
    /// An id unknown to this tenant fails the whole batch with `NotFound`.
    /// An empty list writes nothing and returns the current order.
    pub fn reorder_stages(&self, ids: &[StageId]) -> ServiceResult<Vec<Stage>> {
        if ids.is_empty() {
            return self.list_stages();
        }
        self.repo.reorder_stages(ids)?;
        info!(
            "event=stage_reorder module=service status=ok tenant={} stages={}",
            self.repo.tenant(),
            ids.len()
        );
        self.list_stages()
    }
}
