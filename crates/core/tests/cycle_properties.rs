//! End-to-end properties of the classify/reconcile/apply loop, driven
//! through the manager against mock collaborators.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use keelhaul_core::classify::{CrossSeedState, DeleteState, UpdatePlan};
use keelhaul_core::testing::{MockPlanApplier, MockSnapshotSource, TorrentFixture};
use keelhaul_core::{
    CycleError, CycleReport, DisabledHardlinkChecker, EngineOptions, SnapshotBatch,
    TorrentManager, TrackerProfile,
};

const DAY: i64 = 86_400;

fn profiles() -> Vec<TrackerProfile> {
    vec![
        TrackerProfile {
            name: "BTN".to_string(),
            trackers: vec!["landof.tv".to_string()],
            delete: 30,
            ..Default::default()
        },
        TrackerProfile {
            name: "RED".to_string(),
            trackers: vec!["flacsfor.me".to_string()],
            delete: 10,
            keep_last: 1,
            throttle: Some(1024),
            ..Default::default()
        },
        TrackerProfile {
            name: "public".to_string(),
            ..Default::default()
        },
    ]
}

fn options() -> EngineOptions {
    EngineOptions {
        remove_category_for_bad_torrents: true,
        workers: 2,
        ..Default::default()
    }
}

/// A small but varied fleet: an expired BTN torrent, a cross-seed pair,
/// an unregistered torrent, a pinned torrent, and two RED torrents
/// covered by a keep-last floor.
fn fleet() -> SnapshotBatch {
    let now = Utc::now().timestamp();
    SnapshotBatch {
        torrents: vec![
            TorrentFixture::new("alpha", "Old.Release.1080p")
                .tracker_url("https://landof.tv/announce/a")
                .completion_on(now - 40 * DAY)
                .added_on(now - 45 * DAY)
                .tags(&["BTN"])
                .build(),
            TorrentFixture::new("bravo", "Shared.Release.1080p")
                .tracker_url("https://landof.tv/announce/b")
                .content_path("/downloads/Shared.Release.1080p")
                .completion_on(now - 2 * DAY)
                .added_on(now - 3 * DAY)
                .downloaded(1024 * 1024)
                .tags(&["BTN"])
                .build(),
            TorrentFixture::new("charlie", "Shared.Release.1080p")
                .tracker_url("https://landof.tv/announce/c")
                .content_path("/downloads/Shared.Release.1080p")
                .completion_on(now - 1 * DAY)
                .added_on(now - 2 * DAY)
                .downloaded(0)
                .tags(&["BTN"])
                .build(),
            TorrentFixture::new("delta", "Dead.Release.1080p")
                .tracker_url("https://landof.tv/announce/d")
                .tracker_msg("private, Unregistered torrent")
                .completion_on(now - 2 * DAY)
                .added_on(now - 3 * DAY)
                .category("tv")
                .tags(&["BTN"])
                .build(),
            TorrentFixture::new("echo", "Pinned.Release.1080p")
                .tracker_url("https://landof.tv/announce/e")
                .completion_on(now - 90 * DAY)
                .added_on(now - 91 * DAY)
                .force_start(true)
                .tags(&["BTN"])
                .build(),
            TorrentFixture::new("fox", "Album.One.FLAC")
                .tracker_url("https://flacsfor.me/announce/f")
                .completion_on(now - 20 * DAY)
                .added_on(now - 60 * DAY)
                .tags(&["RED"])
                .build(),
            TorrentFixture::new("golf", "Album.Two.FLAC")
                .tracker_url("https://flacsfor.me/announce/g")
                .completion_on(now - 20 * DAY)
                .added_on(now - 30 * DAY)
                .tags(&["RED"])
                .build(),
        ],
    }
}

fn manager(source: Arc<MockSnapshotSource>, applier: Arc<MockPlanApplier>) -> TorrentManager {
    TorrentManager::new(
        source,
        applier,
        Arc::new(DisabledHardlinkChecker),
        profiles(),
        options(),
    )
}

/// The tag set a torrent would carry once a plan is applied.
fn desired_tags(current: &[String], plan: &UpdatePlan) -> HashSet<String> {
    let mut tags: HashSet<String> = current
        .iter()
        .filter(|t| !plan.tags_to_remove().iter().any(|r| r == *t))
        .cloned()
        .collect();
    for tag in plan.tags_to_add() {
        tags.insert(tag.clone());
    }
    tags
}

/// Apply every plan to the batch in memory, as a fully-honoring applier
/// would.
fn simulate_apply(batch: &SnapshotBatch, report: &CycleReport) -> SnapshotBatch {
    let mut applied = batch.clone();
    for record in &mut applied.torrents {
        let Some((_, plan)) = report
            .plans
            .iter()
            .find(|(h, _)| h == &record.snapshot.hash)
        else {
            continue;
        };
        let tags = desired_tags(&record.snapshot.tags, plan);
        record.snapshot.tags = tags.into_iter().collect();
        if let Some(limit) = plan.upload_limit {
            record.snapshot.up_limit = limit;
        }
        if plan.clear_category {
            record.snapshot.category = String::new();
        }
    }
    applied
}

#[tokio::test]
async fn test_cycle_decisions() {
    let source = Arc::new(MockSnapshotSource::new(fleet()));
    let manager = manager(Arc::clone(&source), Arc::new(MockPlanApplier::new()));

    let report = manager.run_cycle().await.unwrap();

    let a = |h: &str| report.assessment(h).unwrap();

    assert_eq!(a("alpha").delete_state, DeleteState::Ready);
    assert_eq!(a("bravo").cross_seed, CrossSeedState::Parent);
    assert_eq!(a("charlie").cross_seed, CrossSeedState::Peer);
    assert_eq!(a("delta").delete_state, DeleteState::Ready);
    assert!(a("delta").clear_category);
    assert_eq!(a("echo").delete_state, DeleteState::Never);

    // fox is the older RED torrent; the keep-last floor of one protects
    // it while golf stays deletable.
    assert_eq!(a("fox").delete_state, DeleteState::KeepLast);
    assert_eq!(a("golf").delete_state, DeleteState::Ready);
}

#[tokio::test]
async fn test_tag_families_are_exclusive_in_desired_state() {
    let source = Arc::new(MockSnapshotSource::new(fleet()));
    let manager = manager(Arc::clone(&source), Arc::new(MockPlanApplier::new()));

    let report = manager.run_cycle().await.unwrap();

    let cross_tags: Vec<&str> = CrossSeedState::TAGGED
        .iter()
        .filter_map(|s| s.tag())
        .collect();
    let delete_tags: Vec<&str> = DeleteState::TAGGED.iter().filter_map(|s| s.tag()).collect();

    for record in &report.batch.torrents {
        let hash = &record.snapshot.hash;
        let (_, plan) = report.plans.iter().find(|(h, _)| h == hash).unwrap();
        let desired = desired_tags(&record.snapshot.tags, plan);
        let assessment = report.assessment(hash).unwrap();

        let cross_present: Vec<&&str> = cross_tags
            .iter()
            .filter(|t| desired.contains(**t))
            .collect();
        let delete_present: Vec<&&str> = delete_tags
            .iter()
            .filter(|t| desired.contains(**t))
            .collect();

        match assessment.cross_seed.tag() {
            Some(tag) => assert_eq!(cross_present, [&tag], "torrent {}", hash),
            None => assert!(cross_present.is_empty(), "torrent {}", hash),
        }
        match assessment.delete_state.tag() {
            Some(tag) => assert_eq!(delete_present, [&tag], "torrent {}", hash),
            None => assert!(delete_present.is_empty(), "torrent {}", hash),
        }
    }
}

#[tokio::test]
async fn test_pipeline_is_idempotent_after_apply() {
    let batch = fleet();
    let source = Arc::new(MockSnapshotSource::new(batch.clone()));
    let manager = manager(Arc::clone(&source), Arc::new(MockPlanApplier::new()));

    let first = manager.run_cycle().await.unwrap();
    assert!(first.changed() > 0);

    let applied = simulate_apply(&batch, &first);
    source.set_batch(applied).await;

    let second = manager.run_cycle().await.unwrap();
    for (hash, plan) in &second.plans {
        assert!(
            plan.is_empty(),
            "torrent {} still has pending updates: {:?}",
            hash,
            plan
        );
    }
}

#[tokio::test]
async fn test_fetch_failure_aborts_cycle() {
    let source = Arc::new(MockSnapshotSource::new(fleet()));
    let applier = Arc::new(MockPlanApplier::new());
    let manager = manager(Arc::clone(&source), Arc::clone(&applier));

    source.fail_next_fetch().await;
    let result = manager.run_cycle().await;
    assert!(matches!(result, Err(CycleError::Fetch(_))));

    // Nothing was applied; there are no partial plans to act on.
    assert!(applier.applied().await.is_empty());

    // The next cycle works again.
    let report = manager.run_cycle().await.unwrap();
    assert_eq!(report.batch.torrents.len(), 7);
}

#[tokio::test]
async fn test_apply_skips_settled_torrents() {
    let batch = fleet();
    let source = Arc::new(MockSnapshotSource::new(batch.clone()));
    let applier = Arc::new(MockPlanApplier::new());
    let manager = manager(Arc::clone(&source), Arc::clone(&applier));

    let first = manager.run_cycle().await.unwrap();
    let stats = manager.apply(&first).await;
    assert_eq!(stats.processed, 7);
    assert_eq!(stats.updated, first.changed());
    assert_eq!(stats.failed, 0);

    // A settled fleet produces no further apply traffic.
    source.set_batch(simulate_apply(&batch, &first)).await;
    let second = manager.run_cycle().await.unwrap();
    let stats = manager.apply(&second).await;
    assert_eq!(stats.updated, 0);
    assert_eq!(applier.applied().await.len(), first.changed());
}

#[tokio::test]
async fn test_sweep_removes_tagged_torrents() {
    let now = Utc::now().timestamp();
    let batch = SnapshotBatch {
        torrents: vec![
            TorrentFixture::new("keep", "Healthy.Release")
                .completion_on(now - DAY)
                .build(),
            TorrentFixture::new("gone", "Expired.Release")
                .completion_on(now - 60 * DAY)
                .tags(&["BTN", "_delete_ready"])
                .size_bytes(2048)
                .build(),
        ],
    };
    let source = Arc::new(MockSnapshotSource::new(batch));
    let applier = Arc::new(MockPlanApplier::new());
    let manager = manager(Arc::clone(&source), Arc::clone(&applier));

    let outcome = manager.sweep("_delete_ready", false).await.unwrap();
    assert_eq!(outcome.removed, ["gone"]);
    assert_eq!(outcome.total_size, 2048);

    let removed = applier.removed().await;
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].0, ["gone"]);
    // Files stay on disk; orphan cleanup owns the data side.
    assert!(!removed[0].1);
}
