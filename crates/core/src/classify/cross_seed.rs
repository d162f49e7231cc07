//! Cross-seed group resolution.
//!
//! Requires every torrent's facts to be in place first: group roles are
//! a whole-batch query, and orphan reclassification must observe all
//! tentative states before it runs.

use std::collections::HashMap;

use crate::qbit::SnapshotBatch;

use super::context::RunContext;
use super::types::{Assessment, CrossSeedState};

/// Assign cross-seed roles to every torrent in the batch.
pub fn resolve(
    batch: &SnapshotBatch,
    ctx: &RunContext,
    assessments: &mut HashMap<String, Assessment>,
) {
    // Pass 1: tentative roles from each member's own transfer counters.
    for record in &batch.torrents {
        let snapshot = &record.snapshot;
        let group = ctx.content_group(&snapshot.content_path);

        let Some(assessment) = assessments.get_mut(&snapshot.hash) else {
            continue;
        };

        if group.len() < 2 {
            assessment.cross_seed = CrossSeedState::None;
            continue;
        }

        assessment.cross_seed_hashes = group
            .iter()
            .filter(|h| *h != &snapshot.hash)
            .cloned()
            .collect();

        assessment.cross_seed = if snapshot.amount_left > 0 {
            // Still downloading; not part of the sharing arrangement yet.
            CrossSeedState::None
        } else if snapshot.downloaded == 0 {
            CrossSeedState::Peer
        } else {
            CrossSeedState::Parent
        };
    }

    // Pass 2: a peer with no parent anywhere in its group is an orphan.
    // Runs over the finished tentative map so results cannot depend on
    // iteration order.
    let mut orphans = Vec::new();
    for (hash, assessment) in assessments.iter() {
        if assessment.cross_seed != CrossSeedState::Peer {
            continue;
        }
        let has_parent = assessment.cross_seed_hashes.iter().any(|sibling| {
            assessments
                .get(sibling)
                .map(|a| a.cross_seed == CrossSeedState::Parent)
                .unwrap_or(false)
        });
        if !has_parent {
            orphans.push(hash.clone());
        }
    }
    for hash in orphans {
        if let Some(assessment) = assessments.get_mut(&hash) {
            assessment.cross_seed = CrossSeedState::Orphan;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::types::ClassificationFacts;
    use crate::config::EngineOptions;
    use crate::qbit::{TorrentRecord, TorrentSnapshot};
    use chrono::Utc;
    use std::sync::Arc;

    fn record(hash: &str, content_path: &str, downloaded: u64, amount_left: u64) -> TorrentRecord {
        TorrentRecord {
            snapshot: TorrentSnapshot {
                hash: hash.to_string(),
                content_path: content_path.to_string(),
                downloaded,
                amount_left,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn run(batch: &SnapshotBatch) -> HashMap<String, Assessment> {
        let ctx = RunContext::build(
            Utc::now(),
            Arc::new(Vec::new()),
            EngineOptions::default(),
            batch,
        );
        let mut assessments: HashMap<String, Assessment> = batch
            .torrents
            .iter()
            .map(|r| {
                (
                    r.snapshot.hash.clone(),
                    Assessment::new(ClassificationFacts::default()),
                )
            })
            .collect();
        resolve(batch, &ctx, &mut assessments);
        assessments
    }

    #[test]
    fn test_grouping_parent_peer_and_unrelated() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("parent", "/data/show", 1000, 0),
                record("peer", "/data/show", 0, 0),
                record("other", "/data/movie", 500, 0),
            ],
        };
        let assessments = run(&batch);

        assert_eq!(assessments["parent"].cross_seed, CrossSeedState::Parent);
        assert_eq!(assessments["peer"].cross_seed, CrossSeedState::Peer);
        assert_eq!(assessments["other"].cross_seed, CrossSeedState::None);
        assert!(assessments["other"].cross_seed_hashes.is_empty());
    }

    #[test]
    fn test_group_members_record_each_other() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("aaa", "/data/show", 1000, 0),
                record("bbb", "/data/show", 0, 0),
                record("ccc", "/data/show", 0, 0),
            ],
        };
        let assessments = run(&batch);

        assert_eq!(assessments["aaa"].cross_seed_hashes, ["bbb", "ccc"]);
        assert_eq!(assessments["bbb"].cross_seed_hashes, ["aaa", "ccc"]);
        assert_eq!(assessments["ccc"].cross_seed_hashes, ["aaa", "bbb"]);
    }

    #[test]
    fn test_downloading_member_is_forced_none() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("done", "/data/show", 1000, 0),
                record("partial", "/data/show", 100, 500),
            ],
        };
        let assessments = run(&batch);

        assert_eq!(assessments["partial"].cross_seed, CrossSeedState::None);
        // Still records its group so decision propagation can reach it.
        assert_eq!(assessments["partial"].cross_seed_hashes, ["done"]);
    }

    #[test]
    fn test_peer_without_parent_becomes_orphan() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("peer1", "/data/show", 0, 0),
                record("peer2", "/data/show", 0, 0),
            ],
        };
        let assessments = run(&batch);

        assert_eq!(assessments["peer1"].cross_seed, CrossSeedState::Orphan);
        assert_eq!(assessments["peer2"].cross_seed, CrossSeedState::Orphan);
    }

    #[test]
    fn test_peer_with_parent_stays_peer() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("parent", "/data/show", 1000, 0),
                record("peer1", "/data/show", 0, 0),
                record("peer2", "/data/show", 0, 0),
            ],
        };
        let assessments = run(&batch);

        assert_eq!(assessments["peer1"].cross_seed, CrossSeedState::Peer);
        assert_eq!(assessments["peer2"].cross_seed, CrossSeedState::Peer);
    }
}
