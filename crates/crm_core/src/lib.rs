//! Multi-tenant sales pipeline core: stages, contacts, interactions, tasks
//! and the reports computed over them.
//! Every repository is bound to one tenant at construction.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CrmConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::contact::{Contact, ContactId, ContactListQuery, ContactPatch, NewContact};
pub use model::interaction::{Interaction, InteractionId, InteractionListQuery, NewInteraction};
pub use model::stage::{NewStage, SeedStatus, Stage, StageId, StagePatch, StageSeedOutcome};
pub use model::task::{NewTask, Task, TaskId, TaskListQuery, TaskPatch, TaskPriority};
pub use model::tenant::TenantId;
pub use model::FieldMap;
pub use repo::contact_repo::{ContactRepository, SqliteContactRepository};
pub use repo::interaction_repo::{InteractionRepository, SqliteInteractionRepository};
pub use repo::stage_repo::{SqliteStageRepository, StageRepository};
pub use repo::stats_repo::{SqliteStatsRepository, StatsRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::contact_service::{ContactOverview, ContactService};
pub use service::interaction_service::InteractionService;
pub use service::stage_service::StageService;
pub use service::stats_service::{
    ActivityStats, PipelineStats, StageBucket, StatsService, DEFAULT_ACTIVITY_DAYS,
};
pub use service::task_service::TaskService;
pub use service::{ServiceError, ServiceResult};

pub use rusqlite;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
