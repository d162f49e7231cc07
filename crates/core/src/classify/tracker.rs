//! Tracker profile matching.

use crate::config::{TrackerProfile, PUBLIC_PROFILE_NAME};
use crate::qbit::TrackerMessage;

use super::types::MatchedTracker;

/// Resolve a torrent's tracker profile.
///
/// Profiles are tried in declaration order; the first one with any URL
/// substring contained in any observed announce URL wins. Torrents not
/// flagged private by any tracker message resolve to the profile named
/// "public" regardless of substring matches (public trackers are never
/// substring-matched). No match leaves the torrent without a profile and
/// downstream throttle/delete/keep-last rules stay inert.
pub fn match_profile(
    trackers: &[TrackerMessage],
    is_private: bool,
    profiles: &[TrackerProfile],
) -> Option<MatchedTracker> {
    if !is_private {
        return profiles
            .iter()
            .position(|p| p.name == PUBLIC_PROFILE_NAME)
            .map(|index| MatchedTracker {
                index,
                name: PUBLIC_PROFILE_NAME.to_string(),
            });
    }

    for (index, profile) in profiles.iter().enumerate() {
        let matched = profile.trackers.iter().any(|substring| {
            !substring.is_empty() && trackers.iter().any(|t| t.url.contains(substring))
        });
        if matched {
            return Some(MatchedTracker {
                index,
                name: profile.name.clone(),
            });
        }
    }

    None
}
