//! Types and contracts for download-client operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::UpdatePlan;

/// Tracker status code qBittorrent reports for a tracker that has been
/// contacted but is not working.
pub const TRACKER_STATUS_NOT_WORKING: i64 = 4;

/// Errors that can occur during download-client operations.
#[derive(Debug, Error)]
pub enum QbitError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Immutable per-cycle view of a torrent.
///
/// Owned exclusively by the cycle that fetched it; never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentSnapshot {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// When the torrent was added (unix seconds).
    pub added_on: i64,
    /// When the torrent finished downloading (unix seconds; values at or
    /// below the epoch sentinel mean "not completed").
    pub completion_on: i64,
    /// Absolute path of the torrent's content.
    pub content_path: String,
    /// Save path on disk.
    pub save_path: String,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Current tags, parsed from the client's comma-joined string.
    pub tags: Vec<String>,
    /// Category/label, empty when unset.
    pub category: String,
    /// Force-start flag.
    pub force_start: bool,
    /// Bytes left to download; 0 when complete.
    pub amount_left: u64,
    /// Bytes downloaded in this session's lifetime. 0 means the torrent
    /// seeded entirely from already-present data.
    pub downloaded: u64,
    /// Current download speed in bytes/second.
    pub dl_speed: u64,
    /// Upload limit in bytes/second; -1 when unlimited.
    pub up_limit: i64,
    /// Number of complete seeders in the swarm.
    pub num_complete: i64,
}

/// Per-torrent-per-tracker status message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerMessage {
    pub url: String,
    /// Tracker tier; negative for disabled entries and the DHT/PeX/LSD
    /// pseudo-trackers.
    pub tier: i64,
    pub status: i64,
    pub msg: String,
}

impl TrackerMessage {
    /// Whether this entry is a live (non-disabled) tracker.
    pub fn is_live(&self) -> bool {
        self.tier >= 0
    }
}

/// A file inside a torrent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// One torrent with everything the engine needs to classify it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub snapshot: TorrentSnapshot,
    pub trackers: Vec<TrackerMessage>,
    pub files: Vec<FileEntry>,
}

impl TorrentRecord {
    /// Live (tier >= 0) tracker entries.
    pub fn live_trackers(&self) -> impl Iterator<Item = &TrackerMessage> {
        self.trackers.iter().filter(|t| t.is_live())
    }
}

/// The full fleet view for one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotBatch {
    pub torrents: Vec<TorrentRecord>,
}

/// Parse qBittorrent's comma-joined tag string into an ordered list.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trait for fetching the per-cycle fleet snapshot.
///
/// Any failure aborts the cycle: classifying against a partial torrent
/// list could apply deletions based on an incomplete cross-seed view.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch all torrents with their tracker messages and file lists.
    async fn fetch_batch(&self) -> Result<SnapshotBatch, QbitError>;
}

/// Trait for applying update plans back to the client.
///
/// The engine never calls this itself; the caller picks the
/// implementation, and a logging-only implementation is dry-run mode.
#[async_trait]
pub trait PlanApplier: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Apply one torrent's update plan: add tags, remove tags, set the
    /// upload limit, clear the category.
    async fn apply(&self, hash: &str, plan: &UpdatePlan) -> Result<(), QbitError>;

    /// Remove torrents from the client.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove_torrents(&self, hashes: &[String], delete_files: bool)
        -> Result<(), QbitError>;
}
