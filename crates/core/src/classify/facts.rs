//! Per-torrent fact extraction.
//!
//! Pure function of one torrent's own data plus the read-only profile
//! list; safe to fan out across torrents.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::config::{EngineOptions, TrackerProfile};
use crate::qbit::{TorrentRecord, TRACKER_STATUS_NOT_WORKING};

use super::tracker;
use super::types::ClassificationFacts;

/// Tracker message fragments that mark a torrent as unregistered.
/// Deliberately permissive: a false positive costs a tag, a false
/// negative keeps seeding a dead torrent forever.
const UNREGISTERED_KEYWORDS: [&str; 10] = [
    "Unregistered",
    "not registered",
    "pack out",
    "Complete Season",
    "Dupe of",
    "beyond-hd.me",
    "InfoHash not found",
    "Tracker Inactive",
    "Invalid InfoHash",
    "unregistered torrent",
];

static EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S\d{2}\.?E\d{2}").expect("episode regex"));

static SEASON_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)S\d{1,2}[^E]",   // "S01", "S01-S02", season without episode
        r"(?i)Season \d+",     // "Season 1"
        r"(?i)Series \d+",     // "Series 1"
        r"(?i)S\d{1,2}\s?$",   // "S05" at the end of the name
    ]
    .iter()
    .map(|p| Regex::new(p).expect("season regex"))
    .collect()
});

/// Classify a torrent name as season pack / single episode / unknown.
///
/// An explicit episode marker always wins; the season patterns only run
/// afterwards. Names matching neither stay unclassified so callers can
/// distinguish "confirmed not a pack" from "could not tell".
pub fn season_pack(name: &str) -> Option<bool> {
    if EPISODE_RE.is_match(name) {
        return Some(false);
    }
    if SEASON_RES.iter().any(|re| re.is_match(name)) {
        return Some(true);
    }
    None
}

/// Derive all classification facts for one torrent.
///
/// `is_hardlinked` comes from the file-system collaborator; a stale or
/// unavailable answer must be passed as false.
pub fn extract(
    record: &TorrentRecord,
    profiles: &[TrackerProfile],
    options: &EngineOptions,
    is_hardlinked: bool,
) -> ClassificationFacts {
    let snapshot = &record.snapshot;

    let mut is_private = false;
    let mut is_unregistered = false;
    for tracker in &record.trackers {
        if tracker.msg.contains("private") {
            is_private = true;
        }
        if UNREGISTERED_KEYWORDS.iter().any(|k| tracker.msg.contains(k)) {
            is_unregistered = true;
        }
    }

    let tracker = tracker::match_profile(&record.trackers, is_private, profiles);

    let is_rarred = record.files.iter().any(|f| f.name.ends_with(".rar"));
    let is_multi_file = record.files.len() > 1;
    let is_season_pack = if is_multi_file {
        season_pack(&snapshot.name)
    } else {
        Some(false)
    };

    let polite = tracker
        .as_ref()
        .map(|t| profiles[t.index].polite)
        .unwrap_or(0);
    let is_polite_to_seed = polite > 0 && snapshot.num_complete < polite;

    // Vacuously true with zero live trackers; the decision engine reads
    // that case as "delete-eligible, zero live trackers".
    let is_tracker_error = record
        .live_trackers()
        .all(|t| t.status == TRACKER_STATUS_NOT_WORKING);

    let has_autobrr_tag = snapshot.tags.iter().any(|t| t == &options.autobrr_tag);
    let has_hardlink_tag = snapshot.tags.iter().any(|t| t == &options.hardlink_tag);

    ClassificationFacts {
        is_private,
        is_unregistered,
        is_rarred,
        is_multi_file,
        is_season_pack,
        is_tracker_error,
        is_polite_to_seed,
        has_autobrr_tag,
        has_hardlink_tag,
        is_hardlinked,
        tracker,
    }
}
