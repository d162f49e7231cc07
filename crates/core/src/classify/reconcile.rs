//! Tag/limit/category reconciliation.
//!
//! Turns facts plus decision state into a minimal update plan. Mutually
//! exclusive tag families (cross-seed roles, delete states) end up with
//! exactly one tag present; the None variants leave the family empty.

use crate::qbit::TorrentRecord;

use super::context::RunContext;
use super::types::{
    Assessment, CrossSeedState, DeleteState, UpdatePlan, CROSS_SEED_ALL_TAG,
};

pub const UNREGISTERED_TAG: &str = "_unregistered";
pub const TRACKER_ERROR_TAG: &str = "_tracker_error";
pub const RARRED_TAG: &str = "_rarred";
pub const SEASON_PACK_TAG: &str = "_season_pack";
pub const THROTTLED_TAG: &str = "_throttled";

/// Build the update plan for one torrent.
pub fn plan(record: &TorrentRecord, assessment: &Assessment, ctx: &RunContext) -> UpdatePlan {
    let snapshot = &record.snapshot;
    let current = &snapshot.tags;
    let facts = &assessment.facts;
    let mut plan = UpdatePlan::default();

    if let Some(matched) = &facts.tracker {
        let profile = &ctx.profiles[matched.index];

        // Seeding and downloading throttle independently; an absent rate
        // means unlimited (-1). An explicit 0 also reads as unlimited so
        // the plan converges instead of fighting the client's -1.
        let rate = if snapshot.amount_left == 0 || snapshot.dl_speed == 0 {
            profile.throttle
        } else {
            profile.throttle_dl
        };
        let limit = match rate {
            None | Some(0) => -1,
            Some(kib) => kib * 1024,
        };
        if snapshot.up_limit != limit {
            plan.upload_limit = Some(limit);
        }

        // Tracker tags are add-only; stale ones are left for the
        // operator to prune.
        plan.add_tag(current, &matched.name);
    }

    plan.set_tag(current, UNREGISTERED_TAG, facts.is_unregistered);
    plan.set_tag(
        current,
        TRACKER_ERROR_TAG,
        facts.is_tracker_error && !facts.is_unregistered,
    );
    plan.set_tag(current, RARRED_TAG, facts.is_rarred);
    plan.set_tag(current, SEASON_PACK_TAG, facts.is_season_pack == Some(true));

    // Judged against the limit in effect once this plan is applied, so a
    // second pass over the applied state queues nothing.
    let effective_limit = plan.upload_limit.unwrap_or(snapshot.up_limit);
    plan.set_tag(current, THROTTLED_TAG, effective_limit > 0);

    plan.set_tag(
        current,
        CROSS_SEED_ALL_TAG,
        assessment.cross_seed != CrossSeedState::None,
    );
    for state in CrossSeedState::TAGGED {
        if let Some(tag) = state.tag() {
            plan.set_tag(current, tag, assessment.cross_seed == state);
        }
    }

    for state in DeleteState::TAGGED {
        if let Some(tag) = state.tag() {
            plan.set_tag(current, tag, assessment.delete_state == state);
        }
    }

    if ctx.options.tag_hardlinks {
        plan.set_tag(current, &ctx.options.hardlink_tag, facts.is_hardlinked);
    }

    // Category-clear only when there is something to clear, and never
    // for the autobrr category.
    if assessment.clear_category
        && !snapshot.category.is_empty()
        && snapshot.category != ctx.options.autobrr_category
    {
        plan.clear_category = true;
    }

    plan
}
