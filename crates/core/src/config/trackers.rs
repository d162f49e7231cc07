use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ConfigError;

/// Name of the catch-all profile applied to torrents that no tracker
/// message flags as private. Looked up by name, never substring-matched.
pub const PUBLIC_PROFILE_NAME: &str = "public";

/// A configured tracker policy.
///
/// Profiles are declared as a JSON array and matched in declaration order:
/// the first profile with any `trackers` substring contained in any of a
/// torrent's announce URLs wins.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackerProfile {
    pub name: String,
    /// URL substrings used for matching.
    #[serde(default)]
    pub trackers: Vec<String>,
    /// Marks the tracker as private in the profile itself; matching relies
    /// on tracker messages, this is informational.
    #[serde(default)]
    pub private: bool,
    /// Age-based deletion threshold in days; 0 disables the rule.
    #[serde(default)]
    pub delete: i64,
    /// Deletion threshold for autobrr-tagged torrents; falls back to the
    /// configured default when absent.
    #[serde(default)]
    pub autobrr_delete: Option<i64>,
    /// Keep seeding while the swarm has fewer complete seeders than this.
    #[serde(default)]
    pub polite: i64,
    /// Retention floor: the N oldest torrents on this tracker are kept.
    #[serde(default)]
    pub keep_last: usize,
    /// Upload throttle while seeding, in KiB/s. Absent means unlimited.
    #[serde(default)]
    pub throttle: Option<i64>,
    /// Upload throttle while downloading, in KiB/s. Absent means unlimited.
    #[serde(default)]
    pub throttle_dl: Option<i64>,
    /// Share ratio limit, forwarded to the client as-is.
    #[serde(default)]
    pub ratio_limit: Option<f64>,
    /// Seeding time limit in minutes, forwarded to the client as-is.
    #[serde(default)]
    pub seeding_time_limit: Option<i64>,
}

/// Load tracker profiles from a JSON file.
///
/// A missing file is a fatal startup error; classification cannot run
/// without a policy set.
pub fn load_tracker_profiles(path: &Path) -> Result<Vec<TrackerProfile>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    serde_json::from_str(&raw)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}
