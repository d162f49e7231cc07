//! Cycle orchestration: fetch, classify, reconcile, apply.
//!
//! The manager owns the phase ordering. Fact extraction fans out across
//! a bounded worker pool; everything after it is a whole-batch
//! computation and runs behind an explicit barrier.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::classify::{self, Assessment, ClassificationFacts, RunContext, UpdatePlan};
use crate::config::{EngineOptions, TrackerProfile};
use crate::hardlink::HardlinkChecker;
use crate::qbit::{PlanApplier, QbitError, SnapshotBatch, SnapshotSource};

/// Errors that abort an operation outright.
#[derive(Debug, Error)]
pub enum CycleError {
    /// A partial fleet view could apply deletions based on an incomplete
    /// cross-seed picture, so fetch failures abort the whole cycle.
    #[error("Snapshot fetch failed: {0}")]
    Fetch(#[source] QbitError),

    #[error("Removal failed: {0}")]
    Remove(#[source] QbitError),
}

/// Everything one classification cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    pub batch: SnapshotBatch,
    pub assessments: HashMap<String, Assessment>,
    /// One plan per torrent, in batch order. Most are empty on a settled
    /// fleet.
    pub plans: Vec<(String, UpdatePlan)>,
}

impl CycleReport {
    pub fn assessment(&self, hash: &str) -> Option<&Assessment> {
        self.assessments.get(hash)
    }

    /// Number of torrents whose plan would change anything.
    pub fn changed(&self) -> usize {
        self.plans.iter().filter(|(_, p)| !p.is_empty()).count()
    }
}

/// Counters from applying a cycle's plans.
#[derive(Debug, Default)]
pub struct ApplyStats {
    pub processed: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Result of a sweep over a delete tag.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub removed: Vec<String>,
    pub total_size: u64,
}

/// Drives the classify/reconcile/apply loop against the collaborators.
pub struct TorrentManager {
    source: Arc<dyn SnapshotSource>,
    applier: Arc<dyn PlanApplier>,
    hardlinks: Arc<dyn HardlinkChecker>,
    profiles: Arc<Vec<TrackerProfile>>,
    options: EngineOptions,
}

impl TorrentManager {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        applier: Arc<dyn PlanApplier>,
        hardlinks: Arc<dyn HardlinkChecker>,
        profiles: Vec<TrackerProfile>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            applier,
            hardlinks,
            profiles: Arc::new(profiles),
            options,
        }
    }

    /// Fetch a fleet snapshot and classify it. No changes are applied.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let batch = self
            .source
            .fetch_batch()
            .await
            .map_err(CycleError::Fetch)?;
        info!(
            "Fetched {} torrents from {}",
            batch.torrents.len(),
            self.source.name()
        );

        let ctx = RunContext::build(
            Utc::now(),
            Arc::clone(&self.profiles),
            self.options.clone(),
            &batch,
        );

        let facts = self.extract_facts(&batch, &ctx).await;

        // Barrier: group roles and retention ranking are whole-batch
        // queries, so every torrent's facts must be in before this point.
        let assessments = classify::finish(&batch, &ctx, facts);
        let plans = classify::plan_all(&batch, &ctx, &assessments);

        Ok(CycleReport {
            batch,
            assessments,
            plans,
        })
    }

    /// Fan fact extraction out over the worker pool. The hard-link stat
    /// is the only potentially slow piece, so it runs on the blocking
    /// pool; extraction itself is pure.
    async fn extract_facts(
        &self,
        batch: &SnapshotBatch,
        ctx: &RunContext,
    ) -> HashMap<String, ClassificationFacts> {
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));

        let tasks = batch.torrents.iter().map(|record| {
            let semaphore = Arc::clone(&semaphore);
            let hardlinks = Arc::clone(&self.hardlinks);
            async move {
                let _permit = semaphore.acquire().await.ok();

                let is_hardlinked = if ctx.options.tag_hardlinks {
                    let path = record.snapshot.content_path.clone();
                    tokio::task::spawn_blocking(move || hardlinks.is_hardlinked(&path))
                        .await
                        .unwrap_or(false)
                } else {
                    false
                };

                (
                    record.snapshot.hash.clone(),
                    classify::facts::extract(record, &ctx.profiles, &ctx.options, is_hardlinked),
                )
            }
        });

        futures::future::join_all(tasks).await.into_iter().collect()
    }

    /// Apply a cycle's plans through the configured applier.
    ///
    /// Per-torrent failures are logged and counted, not propagated; one
    /// flaky update must not abandon the rest of the fleet.
    pub async fn apply(&self, report: &CycleReport) -> ApplyStats {
        let mut stats = ApplyStats {
            processed: report.plans.len(),
            ..Default::default()
        };

        let names: HashMap<&str, &str> = report
            .batch
            .torrents
            .iter()
            .map(|r| (r.snapshot.hash.as_str(), r.snapshot.name.as_str()))
            .collect();

        for (hash, plan) in &report.plans {
            let mut plan = plan.clone();
            if !self.options.remove_category_for_bad_torrents {
                plan.clear_category = false;
            }
            if plan.is_empty() {
                continue;
            }

            let tracker = report
                .assessments
                .get(hash)
                .and_then(|a| a.facts.tracker.as_ref())
                .map(|t| t.name.as_str())
                .unwrap_or("-");
            let name = names.get(hash.as_str()).copied().unwrap_or("?");
            info!("Updating [{}] torrent {} ({})", tracker, name, hash);

            match self.applier.apply(hash, &plan).await {
                Ok(()) => stats.updated += 1,
                Err(e) => {
                    warn!("Failed to update torrent {}: {}", hash, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Processed {} torrents and updated {} torrents",
            stats.processed, stats.updated
        );
        stats
    }

    /// Remove every torrent carrying the given tag.
    ///
    /// Files stay on disk unless `delete_files` is set; orphan cleanup
    /// owns the data side.
    pub async fn sweep(&self, tag: &str, delete_files: bool) -> Result<SweepOutcome, CycleError> {
        let batch = self
            .source
            .fetch_batch()
            .await
            .map_err(CycleError::Fetch)?;

        let mut outcome = SweepOutcome::default();
        for record in &batch.torrents {
            let snapshot = &record.snapshot;
            if !snapshot.tags.iter().any(|t| t == tag) {
                continue;
            }
            info!(
                "Removing torrent '{}' ({}) with size {}",
                snapshot.name,
                snapshot.hash,
                format_bytes(snapshot.size_bytes)
            );
            outcome.total_size += snapshot.size_bytes;
            outcome.removed.push(snapshot.hash.clone());
        }

        if !outcome.removed.is_empty() {
            self.applier
                .remove_torrents(&outcome.removed, delete_files)
                .await
                .map_err(CycleError::Remove)?;
        }

        info!(
            "Total size of removed torrents with '{}' tag: {}",
            tag,
            format_bytes(outcome.total_size)
        );
        Ok(outcome)
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
