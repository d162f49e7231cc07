//! Per-run context: the whole-batch indexes the decision phases query.
//!
//! Built once per cycle and read-only afterwards; nothing here survives
//! between runs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{EngineOptions, TrackerProfile};
use crate::qbit::SnapshotBatch;

/// Completion timestamps at or below this value are treated as
/// "not yet completed"; age-based rules never fire for them.
pub const EPOCH_SENTINEL: i64 = 1_000_000_000;

/// Torrents above this size are never considered for keep-last
/// retention (10 GiB).
pub const KEEP_LAST_MAX_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Normalize a content path for grouping: trailing-slash terminated.
pub fn normalize_content_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Read-only context for one classification run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Cycle timestamp; injected so age rules are deterministic in tests.
    pub now: DateTime<Utc>,
    pub profiles: Arc<Vec<TrackerProfile>>,
    pub options: EngineOptions,
    /// Normalized content path -> hashes of torrents sharing it.
    content_paths: HashMap<String, Vec<String>>,
    /// Current tag -> hashes carrying it.
    tag_hashes: HashMap<String, Vec<String>>,
}

impl RunContext {
    pub fn build(
        now: DateTime<Utc>,
        profiles: Arc<Vec<TrackerProfile>>,
        options: EngineOptions,
        batch: &SnapshotBatch,
    ) -> Self {
        let mut content_paths: HashMap<String, Vec<String>> = HashMap::new();
        let mut tag_hashes: HashMap<String, Vec<String>> = HashMap::new();

        for record in &batch.torrents {
            let snapshot = &record.snapshot;
            content_paths
                .entry(normalize_content_path(&snapshot.content_path))
                .or_default()
                .push(snapshot.hash.clone());

            for tag in &snapshot.tags {
                tag_hashes
                    .entry(tag.clone())
                    .or_default()
                    .push(snapshot.hash.clone());
            }
        }

        Self {
            now,
            profiles,
            options,
            content_paths,
            tag_hashes,
        }
    }

    /// Hashes of all torrents sharing this content path (normalized
    /// before lookup), including the caller's own.
    pub fn content_group(&self, content_path: &str) -> &[String] {
        self.content_paths
            .get(&normalize_content_path(content_path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Hashes of all torrents currently carrying a tag.
    pub fn hashes_with_tag(&self, tag: &str) -> &[String] {
        self.tag_hashes
            .get(tag)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qbit::{TorrentRecord, TorrentSnapshot};

    fn record(hash: &str, content_path: &str, tags: &[&str]) -> TorrentRecord {
        TorrentRecord {
            snapshot: TorrentSnapshot {
                hash: hash.to_string(),
                content_path: content_path.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_content_path() {
        assert_eq!(normalize_content_path("/data/show"), "/data/show/");
        assert_eq!(normalize_content_path("/data/show/"), "/data/show/");
    }

    #[test]
    fn test_content_groups_ignore_trailing_slash() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("aaa", "/data/show", &[]),
                record("bbb", "/data/show/", &[]),
                record("ccc", "/data/other", &[]),
            ],
        };
        let ctx = RunContext::build(
            Utc::now(),
            Arc::new(Vec::new()),
            EngineOptions::default(),
            &batch,
        );

        assert_eq!(ctx.content_group("/data/show"), ["aaa", "bbb"]);
        assert_eq!(ctx.content_group("/data/show/"), ["aaa", "bbb"]);
        assert_eq!(ctx.content_group("/data/other"), ["ccc"]);
        assert!(ctx.content_group("/data/unknown").is_empty());
    }

    #[test]
    fn test_tag_index() {
        let batch = SnapshotBatch {
            torrents: vec![
                record("aaa", "/a", &["BTN", "autobrr"]),
                record("bbb", "/b", &["BTN"]),
            ],
        };
        let ctx = RunContext::build(
            Utc::now(),
            Arc::new(Vec::new()),
            EngineOptions::default(),
            &batch,
        );

        assert_eq!(ctx.hashes_with_tag("BTN"), ["aaa", "bbb"]);
        assert_eq!(ctx.hashes_with_tag("autobrr"), ["aaa"]);
        assert!(ctx.hashes_with_tag("RED").is_empty());
    }
}
