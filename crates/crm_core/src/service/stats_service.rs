//! Pipeline and activity reports.
//!
//! # Responsibility
//! - Reduce repository projections into per-stage and windowed summaries.
//!
//! # Invariants
//! - Pipeline bucket counts and values sum to the reported totals.
//! - The `Unstaged` bucket is listed first and only when non-empty.
//! - Inactive contacts never contribute to pipeline figures.

use crate::model::stage::{Stage, StageId};
use crate::repo::now_epoch_ms;
use crate::repo::stats_repo::{DealRow, StatsRepository};
use crate::service::ServiceResult;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_ACTIVITY_DAYS: u32 = 30;
pub const UNSTAGED_BUCKET_NAME: &str = "Unstaged";

const DAY_MS: i64 = 86_400_000;

/// Active contacts grouped under one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageBucket {
    /// `None` for the synthetic unstaged bucket.
    pub stage_id: Option<StageId>,
    pub name: String,
    pub position: i64,
    pub color: Option<String>,
    pub count: u64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStats {
    pub stages: Vec<StageBucket>,
    pub total_contacts: u64,
    pub total_value: f64,
}

/// Counts over records created in the trailing `days` window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub days: u32,
    /// Window start, epoch ms, inclusive.
    pub since: i64,
    pub interactions_total: u64,
    pub interactions_by_type: BTreeMap<String, u64>,
    pub tasks_created: u64,
    /// Tasks created in the window that are currently completed.
    pub tasks_created_completed: u64,
    /// Tasks whose `completed_at` falls in the window.
    pub tasks_completed_in_window: u64,
    pub contacts_created: u64,
    pub contacts_created_active: u64,
}

#[derive(Default)]
struct Tally {
    count: u64,
    value: f64,
}

/// Reporting service over a stats repository.
pub struct StatsService<R: StatsRepository> {
    repo: R,
}

impl<R: StatsRepository> StatsService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Per-stage counts and deal value sums over active contacts.
    pub fn pipeline_stats(&self) -> ServiceResult<PipelineStats> {
        let stages = self.repo.list_stages()?;
        let deals = self.repo.list_active_deals()?;
        let stats = reduce_pipeline(&stages, &deals);

        debug!(
            "event=stats_pipeline module=service status=ok tenant={} buckets={} total_contacts={}",
            self.repo.tenant(),
            stats.stages.len(),
            stats.total_contacts
        );
        Ok(stats)
    }

    /// Activity counts for the trailing `days` days.
    pub fn activity_stats(&self, days: u32) -> ServiceResult<ActivityStats> {
        let since = now_epoch_ms() - i64::from(days) * DAY_MS;

        let kinds = self.repo.interaction_kinds_since(since)?;
        let task_flags = self.repo.task_completion_flags_since(since)?;
        let tasks_completed_in_window = self.repo.count_tasks_completed_since(since)?;
        let contact_flags = self.repo.contact_active_flags_since(since)?;

        let mut interactions_by_type = BTreeMap::new();
        for kind in &kinds {
            *interactions_by_type.entry(kind.clone()).or_insert(0) += 1;
        }

        let stats = ActivityStats {
            days,
            since,
            interactions_total: kinds.len() as u64,
            interactions_by_type,
            tasks_created: task_flags.len() as u64,
            tasks_created_completed: count_true(&task_flags),
            tasks_completed_in_window,
            contacts_created: contact_flags.len() as u64,
            contacts_created_active: count_true(&contact_flags),
        };
        debug!(
            "event=stats_activity module=service status=ok tenant={} days={} interactions={} tasks={} contacts={}",
            self.repo.tenant(),
            days,
            stats.interactions_total,
            stats.tasks_created,
            stats.contacts_created
        );
        Ok(stats)
    }
}

fn count_true(flags: &[bool]) -> u64 {
    flags.iter().filter(|flag| **flag).count() as u64
}

fn reduce_pipeline(stages: &[Stage], deals: &[DealRow]) -> PipelineStats {
    let mut tallies: HashMap<Option<StageId>, Tally> = HashMap::new();
    let mut total_contacts = 0;
    let mut total_value = 0.0;
    for deal in deals {
        let value = deal.deal_value.unwrap_or(0.0);
        let tally = tallies.entry(deal.stage_id).or_default();
        tally.count += 1;
        tally.value += value;
        total_contacts += 1;
        total_value += value;
    }

    let mut buckets = Vec::with_capacity(stages.len() + 1);
    if let Some(unstaged) = tallies.remove(&None) {
        buckets.push(StageBucket {
            stage_id: None,
            name: UNSTAGED_BUCKET_NAME.to_string(),
            position: 0,
            color: None,
            count: unstaged.count,
            value: unstaged.value,
        });
    }
    for stage in stages {
        let tally = tallies.remove(&Some(stage.id)).unwrap_or_default();
        buckets.push(StageBucket {
            stage_id: Some(stage.id),
            name: stage.name.clone(),
            position: stage.position,
            color: stage.color.clone(),
            count: tally.count,
            value: tally.value,
        });
    }

    PipelineStats {
        stages: buckets,
        total_contacts,
        total_value,
    }
}
