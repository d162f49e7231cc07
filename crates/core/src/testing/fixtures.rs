//! Builder-style torrent fixtures for tests.

use crate::qbit::{FileEntry, TorrentRecord, TorrentSnapshot, TrackerMessage};

/// Builds a plausible private torrent record one field at a time.
///
/// # Example
///
/// ```rust,ignore
/// let record = TorrentFixture::new("abc123", "Show.Name.S02.Complete.1080p")
///     .tracker_url("https://landof.tv/announce/x")
///     .completed_days_ago(40, now)
///     .tags(&["BTN"])
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TorrentFixture {
    record: TorrentRecord,
}

impl TorrentFixture {
    pub fn new(hash: &str, name: &str) -> Self {
        Self {
            record: TorrentRecord {
                snapshot: TorrentSnapshot {
                    hash: hash.to_string(),
                    name: name.to_string(),
                    content_path: format!("/downloads/{}", name),
                    save_path: "/downloads".to_string(),
                    size_bytes: 1024 * 1024,
                    downloaded: 1024 * 1024,
                    up_limit: -1,
                    ..Default::default()
                },
                trackers: vec![TrackerMessage {
                    url: "https://tracker.example/announce/x".to_string(),
                    tier: 0,
                    status: 2,
                    msg: "This torrent is private".to_string(),
                }],
                files: vec![FileEntry {
                    name: format!("{}.mkv", name),
                    size: 1024 * 1024,
                }],
            },
        }
    }

    pub fn tracker_url(mut self, url: &str) -> Self {
        if let Some(tracker) = self.record.trackers.first_mut() {
            tracker.url = url.to_string();
        }
        self
    }

    pub fn tracker_msg(mut self, msg: &str) -> Self {
        if let Some(tracker) = self.record.trackers.first_mut() {
            tracker.msg = msg.to_string();
        }
        self
    }

    pub fn trackers(mut self, trackers: Vec<TrackerMessage>) -> Self {
        self.record.trackers = trackers;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.record.snapshot.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn content_path(mut self, path: &str) -> Self {
        self.record.snapshot.content_path = path.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.record.snapshot.category = category.to_string();
        self
    }

    pub fn added_on(mut self, added_on: i64) -> Self {
        self.record.snapshot.added_on = added_on;
        self
    }

    pub fn completion_on(mut self, completion_on: i64) -> Self {
        self.record.snapshot.completion_on = completion_on;
        self
    }

    pub fn size_bytes(mut self, size: u64) -> Self {
        self.record.snapshot.size_bytes = size;
        self
    }

    pub fn downloaded(mut self, downloaded: u64) -> Self {
        self.record.snapshot.downloaded = downloaded;
        self
    }

    pub fn amount_left(mut self, amount_left: u64) -> Self {
        self.record.snapshot.amount_left = amount_left;
        self
    }

    pub fn force_start(mut self, force_start: bool) -> Self {
        self.record.snapshot.force_start = force_start;
        self
    }

    pub fn num_complete(mut self, num_complete: i64) -> Self {
        self.record.snapshot.num_complete = num_complete;
        self
    }

    pub fn up_limit(mut self, up_limit: i64) -> Self {
        self.record.snapshot.up_limit = up_limit;
        self
    }

    pub fn files(mut self, names: &[&str]) -> Self {
        self.record.files = names
            .iter()
            .map(|n| FileEntry {
                name: n.to_string(),
                size: 1024,
            })
            .collect();
        self
    }

    pub fn build(self) -> TorrentRecord {
        self.record
    }
}
