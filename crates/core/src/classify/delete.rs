//! Deletion lifecycle decisions.
//!
//! A per-torrent rule chain evaluated once per cycle against the full
//! batch. Whole-batch queries (keep-last ranking, cross-seed group fate)
//! make this phase a barrier: every torrent's facts and cross-seed role
//! must be known before it runs. Nothing is carried over between cycles.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, TimeZone, Utc};

use crate::qbit::{SnapshotBatch, TorrentRecord, TorrentSnapshot};

use super::context::{RunContext, EPOCH_SENTINEL, KEEP_LAST_MAX_SIZE};
use super::types::{Assessment, ClassificationFacts, CrossSeedState, DeleteState};

/// Compute the deletion state for every torrent in the batch.
pub fn decide(
    batch: &SnapshotBatch,
    ctx: &RunContext,
    assessments: &mut HashMap<String, Assessment>,
) {
    let keep_sets = keep_last_sets(batch, ctx, assessments);

    for record in &batch.torrents {
        decide_one(record, ctx, &keep_sets, assessments);
    }
}

fn decide_one(
    record: &TorrentRecord,
    ctx: &RunContext,
    keep_sets: &HashMap<String, HashSet<String>>,
    assessments: &mut HashMap<String, Assessment>,
) {
    let snapshot = &record.snapshot;
    let hash = &snapshot.hash;

    let Some(current) = assessments.get(hash) else {
        return;
    };
    let facts = current.facts.clone();
    let cross_seed = current.cross_seed;
    let cross_seed_hashes = current.cross_seed_hashes.clone();

    // Force-started torrents are pinned, but an explicit unregistered or
    // dead-tracker rule below may still claim them.
    if snapshot.force_start {
        set_state(assessments, hash, DeleteState::Never);
    }

    // Nothing announces this torrent anywhere; keeping it serves no one.
    if record.live_trackers().next().is_none() {
        if let Some(a) = assessments.get_mut(hash) {
            a.delete_state = DeleteState::Delete;
            a.clear_category = true;
        }
        return;
    }

    // Clear the category on broken torrents so sonarr/radarr can give up
    // on them. Side effect only; evaluation continues.
    if facts.is_tracker_error || facts.is_unregistered {
        if let Some(a) = assessments.get_mut(hash) {
            a.clear_category = true;
        }
    }

    if facts.is_unregistered && cross_seed == CrossSeedState::None {
        set_state(assessments, hash, DeleteState::Ready);
        return;
    }

    // Age rule, only while nothing above claimed the torrent.
    if assessments.get(hash).map(|a| a.delete_state) != Some(DeleteState::None) {
        return;
    }

    let Some(matched) = facts.tracker.as_ref() else {
        return;
    };
    let profile = &ctx.profiles[matched.index];

    let delete_days = if facts.has_autobrr_tag {
        profile
            .autobrr_delete
            .unwrap_or(ctx.options.default_autobrr_delete_days)
    } else {
        profile.delete
    };
    if delete_days <= 0 {
        return;
    }

    // A malformed completion timestamp means "not yet completed".
    if snapshot.completion_on <= EPOCH_SENTINEL {
        return;
    }
    let Some(completed) = Utc.timestamp_opt(snapshot.completion_on, 0).single() else {
        return;
    };

    // Strictly past the threshold; completing exactly delete_days ago is
    // not enough.
    if ctx.now <= completed + Duration::days(delete_days) {
        return;
    }

    match cross_seed {
        CrossSeedState::None => {
            let state = expired_state(&facts, keeps_season_packs(ctx, &matched.name));
            set_state(assessments, hash, state);
        }
        CrossSeedState::Parent => {
            // Cross-seed siblings share one fate: the parent's resolved
            // state lands on every group member. Season-pack preservation
            // considers every member's tracker, not just the parent's.
            let mut preserved = keeps_season_packs(ctx, &matched.name);
            for sibling in &cross_seed_hashes {
                if let Some(tracker) = assessments
                    .get(sibling)
                    .and_then(|a| a.facts.tracker.as_ref())
                {
                    preserved = preserved || keeps_season_packs(ctx, &tracker.name);
                }
            }

            let state = expired_state(&facts, preserved);
            set_state(assessments, hash, state);
            for sibling in &cross_seed_hashes {
                set_state(assessments, sibling, state);
            }
        }
        CrossSeedState::Peer | CrossSeedState::Orphan => {
            // The owning parent, if any, drives the group's fate.
        }
    }

    // Retention floor overrides whatever the age rule resolved.
    if let Some(keep) = keep_sets.get(&matched.name) {
        if keep.contains(hash) {
            set_state(assessments, hash, DeleteState::KeepLast);
        }
    }
}

/// Resolve the state for a torrent past its age threshold.
fn expired_state(facts: &ClassificationFacts, season_preserved: bool) -> DeleteState {
    if facts.has_autobrr_tag && facts.is_private {
        DeleteState::AutobrrDelete
    } else if season_preserved && facts.is_season_pack == Some(true) {
        DeleteState::Never
    } else if facts.has_hardlink_tag && facts.is_private {
        DeleteState::HardlinkDelete
    } else if facts.is_polite_to_seed {
        DeleteState::DeleteIfNeeded
    } else {
        DeleteState::Ready
    }
}

fn keeps_season_packs(ctx: &RunContext, profile_name: &str) -> bool {
    ctx.options
        .season_pack_keep_trackers
        .iter()
        .any(|t| t == profile_name)
}

/// For each profile with a retention floor, the hashes of the N
/// oldest-by-added_on torrents carrying the profile's tracker tag.
/// Autobrr-tagged, cross-seeded and oversized torrents never count.
fn keep_last_sets(
    batch: &SnapshotBatch,
    ctx: &RunContext,
    assessments: &HashMap<String, Assessment>,
) -> HashMap<String, HashSet<String>> {
    let snapshots: HashMap<&str, &TorrentSnapshot> = batch
        .torrents
        .iter()
        .map(|r| (r.snapshot.hash.as_str(), &r.snapshot))
        .collect();

    let mut sets = HashMap::new();
    for profile in ctx.profiles.iter().filter(|p| p.keep_last > 0) {
        let mut candidates: Vec<&str> = ctx
            .hashes_with_tag(&profile.name)
            .iter()
            .map(String::as_str)
            .filter(|h| {
                let (Some(snapshot), Some(assessment)) = (snapshots.get(h), assessments.get(*h))
                else {
                    return false;
                };
                !assessment.facts.has_autobrr_tag
                    && snapshot.size_bytes <= KEEP_LAST_MAX_SIZE
                    && assessment.cross_seed == CrossSeedState::None
            })
            .collect();

        candidates.sort_by_key(|h| snapshots[h].added_on);
        sets.insert(
            profile.name.clone(),
            candidates
                .into_iter()
                .take(profile.keep_last)
                .map(str::to_string)
                .collect(),
        );
    }
    sets
}

fn set_state(assessments: &mut HashMap<String, Assessment>, hash: &str, state: DeleteState) {
    if let Some(a) = assessments.get_mut(hash) {
        a.delete_state = state;
    }
}
