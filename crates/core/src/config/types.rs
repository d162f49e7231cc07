use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub qbittorrent: QBittorrentConfig,
    #[serde(default)]
    pub options: EngineOptions,
}

/// qBittorrent Web API connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Knobs for the classification engine and its collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineOptions {
    /// Path to the tracker profile file (JSON array).
    #[serde(default = "default_tracker_config")]
    pub tracker_config: PathBuf,
    /// Tag that marks torrents fed in by autobrr.
    #[serde(default = "default_autobrr_tag")]
    pub autobrr_tag: String,
    /// Category that autobrr assigns; the category guard never clears it.
    #[serde(default = "default_autobrr_category")]
    pub autobrr_category: String,
    /// Fallback deletion age for autobrr torrents when a profile has no
    /// autobrr_delete value.
    #[serde(default = "default_autobrr_delete_days")]
    pub default_autobrr_delete_days: i64,
    /// Enable the hard-link stat collaborator and the hardlink tag.
    #[serde(default)]
    pub tag_hardlinks: bool,
    /// Tag applied to torrents whose content is hard-linked elsewhere.
    #[serde(default = "default_hardlink_tag")]
    pub hardlink_tag: String,
    /// Whether the applier should honor category-clear requests.
    #[serde(default)]
    pub remove_category_for_bad_torrents: bool,
    /// Tracker profile names whose season packs are never age-deleted.
    #[serde(default)]
    pub season_pack_keep_trackers: Vec<String>,
    /// Worker pool size for the fact-extraction fan-out.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tracker_config: default_tracker_config(),
            autobrr_tag: default_autobrr_tag(),
            autobrr_category: default_autobrr_category(),
            default_autobrr_delete_days: default_autobrr_delete_days(),
            tag_hardlinks: false,
            hardlink_tag: default_hardlink_tag(),
            remove_category_for_bad_torrents: false,
            season_pack_keep_trackers: Vec::new(),
            workers: default_workers(),
        }
    }
}

fn default_tracker_config() -> PathBuf {
    PathBuf::from("trackers.json")
}

fn default_autobrr_tag() -> String {
    "autobrr".to_string()
}

fn default_autobrr_category() -> String {
    "autobrr".to_string()
}

fn default_autobrr_delete_days() -> i64 {
    14
}

fn default_hardlink_tag() -> String {
    "_hardlinked".to_string()
}

fn default_workers() -> usize {
    8
}
