//! The classification and decision engine.
//!
//! A single-pass batch computation over an immutable snapshot: facts are
//! derived per torrent, cross-seed roles and delete decisions follow once
//! every torrent's facts are known, and reconciliation emits one update
//! plan per torrent. The engine performs no I/O and keeps no state
//! between runs.

pub mod context;
pub mod cross_seed;
pub mod delete;
pub mod facts;
pub mod reconcile;
pub mod tracker;
mod types;

use std::collections::HashMap;

use crate::hardlink::HardlinkChecker;
use crate::qbit::SnapshotBatch;

pub use context::{normalize_content_path, RunContext, EPOCH_SENTINEL, KEEP_LAST_MAX_SIZE};
pub use types::{
    Assessment, ClassificationFacts, CrossSeedState, DeleteState, MatchedTracker, UpdatePlan,
    CROSS_SEED_ALL_TAG,
};

/// Run the fact, cross-seed and delete phases for a whole batch.
///
/// Facts are extracted sequentially here; the manager fans them out over
/// a worker pool and calls [`finish`] instead. Results are identical.
pub fn classify_batch(
    batch: &SnapshotBatch,
    ctx: &RunContext,
    hardlinks: &dyn HardlinkChecker,
) -> HashMap<String, Assessment> {
    let facts_by_hash = batch
        .torrents
        .iter()
        .map(|record| {
            let is_hardlinked = ctx.options.tag_hardlinks
                && hardlinks.is_hardlinked(&record.snapshot.content_path);
            (
                record.snapshot.hash.clone(),
                facts::extract(record, &ctx.profiles, &ctx.options, is_hardlinked),
            )
        })
        .collect();

    finish(batch, ctx, facts_by_hash)
}

/// Run the whole-batch phases over pre-extracted facts.
///
/// This is the synchronization barrier: cross-seed resolution and delete
/// decisions observe every torrent's facts, so the map must be complete.
pub fn finish(
    batch: &SnapshotBatch,
    ctx: &RunContext,
    facts_by_hash: HashMap<String, ClassificationFacts>,
) -> HashMap<String, Assessment> {
    let mut assessments: HashMap<String, Assessment> = facts_by_hash
        .into_iter()
        .map(|(hash, facts)| (hash, Assessment::new(facts)))
        .collect();

    cross_seed::resolve(batch, ctx, &mut assessments);
    delete::decide(batch, ctx, &mut assessments);
    assessments
}

/// Build update plans for every torrent, in batch order.
pub fn plan_all(
    batch: &SnapshotBatch,
    ctx: &RunContext,
    assessments: &HashMap<String, Assessment>,
) -> Vec<(String, UpdatePlan)> {
    batch
        .torrents
        .iter()
        .filter_map(|record| {
            assessments.get(&record.snapshot.hash).map(|assessment| {
                (
                    record.snapshot.hash.clone(),
                    reconcile::plan(record, assessment, ctx),
                )
            })
        })
        .collect()
}
