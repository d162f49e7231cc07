//! Core types for the classification and decision engine.

use serde::{Deserialize, Serialize};

/// Role of a torrent within a group sharing the same on-disk content.
///
/// Parent, Peer and Orphan only apply within groups of two or more
/// torrents sharing a normalized content path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossSeedState {
    /// Not cross-seeded (or still downloading).
    #[default]
    None,
    /// The member that actually downloaded the data.
    Parent,
    /// A member that seeded entirely from already-present data.
    Peer,
    /// A peer whose group has no parent left.
    Orphan,
}

/// Marker tag carried by every cross-seeded torrent regardless of role.
pub const CROSS_SEED_ALL_TAG: &str = "_cs_all";

impl CrossSeedState {
    /// Variants that map to a bookkeeping tag. None maps to the absence
    /// of any tag in the family.
    pub const TAGGED: [CrossSeedState; 3] = [
        CrossSeedState::Parent,
        CrossSeedState::Peer,
        CrossSeedState::Orphan,
    ];

    /// The bookkeeping tag for this state, if any.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            CrossSeedState::None => None,
            CrossSeedState::Parent => Some("_cs_parent"),
            CrossSeedState::Peer => Some("_cs_peer"),
            CrossSeedState::Orphan => Some("_cs_orphan"),
        }
    }
}

/// Deletion lifecycle state. Exactly one per torrent at any time,
/// represented as tags via a 1:1 mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteState {
    /// No deletion opinion.
    #[default]
    None,
    /// Zero live trackers; nothing is served by keeping it.
    Delete,
    /// Past its retention rules and safe to remove.
    Ready,
    /// Past retention but still polite to seed; remove only under disk
    /// pressure.
    DeleteIfNeeded,
    /// Protected by the per-tracker retention floor.
    KeepLast,
    /// Past the autobrr-specific retention window.
    AutobrrDelete,
    /// Past retention but the content is hard-linked into the library.
    HardlinkDelete,
    /// Pinned; never deleted.
    Never,
}

impl DeleteState {
    /// Variants that map to a bookkeeping tag. None maps to the absence
    /// of any tag in the family.
    pub const TAGGED: [DeleteState; 7] = [
        DeleteState::Delete,
        DeleteState::Ready,
        DeleteState::DeleteIfNeeded,
        DeleteState::KeepLast,
        DeleteState::AutobrrDelete,
        DeleteState::HardlinkDelete,
        DeleteState::Never,
    ];

    /// The bookkeeping tag for this state, if any.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            DeleteState::None => None,
            DeleteState::Delete => Some("_delete"),
            DeleteState::Ready => Some("_delete_ready"),
            DeleteState::DeleteIfNeeded => Some("_delete_if_needed"),
            DeleteState::KeepLast => Some("_keep_last"),
            DeleteState::AutobrrDelete => Some("_delete_autobrr"),
            DeleteState::HardlinkDelete => Some("_delete_hardlink"),
            DeleteState::Never => Some("_delete_never"),
        }
    }
}

/// The tracker profile a torrent resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedTracker {
    /// Index into the profile list for the run.
    pub index: usize,
    /// Profile name, doubling as the torrent's tracker tag.
    pub name: String,
}

/// Derived per-torrent facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationFacts {
    pub is_private: bool,
    pub is_unregistered: bool,
    pub is_rarred: bool,
    pub is_multi_file: bool,
    /// Tri-state: Some(false) is a confirmed non-pack, None means the
    /// name could not be classified either way.
    pub is_season_pack: Option<bool>,
    pub is_tracker_error: bool,
    pub is_polite_to_seed: bool,
    pub has_autobrr_tag: bool,
    pub has_hardlink_tag: bool,
    pub is_hardlinked: bool,
    pub tracker: Option<MatchedTracker>,
}

/// Everything the engine decided about one torrent in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub facts: ClassificationFacts,
    pub cross_seed: CrossSeedState,
    /// Hashes of all other members of this torrent's content group,
    /// empty unless the group has two or more members.
    pub cross_seed_hashes: Vec<String>,
    pub delete_state: DeleteState,
    /// Category-clear request; honoring it is the applier's decision.
    pub clear_category: bool,
}

impl Assessment {
    pub fn new(facts: ClassificationFacts) -> Self {
        Self {
            facts,
            cross_seed: CrossSeedState::None,
            cross_seed_hashes: Vec::new(),
            delete_state: DeleteState::None,
            clear_category: false,
        }
    }
}

/// Minimal idempotent update for one torrent.
///
/// The add and remove lists are mutually exclusive sets, enforced at
/// insertion time: queueing a tag on one side withdraws it from the
/// other. Re-running reconciliation against a fully-applied tag set
/// therefore yields an empty plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    tags_to_add: Vec<String>,
    tags_to_remove: Vec<String>,
    /// New upload limit in bytes/second (-1 for unlimited), only set
    /// when it differs from the torrent's current limit.
    pub upload_limit: Option<i64>,
    /// Category-clear request forwarded to the applier.
    pub clear_category: bool,
}

impl UpdatePlan {
    /// Queue a tag addition unless the torrent already carries the tag.
    pub fn add_tag(&mut self, current_tags: &[String], tag: &str) {
        if !current_tags.iter().any(|t| t == tag) && !self.tags_to_add.iter().any(|t| t == tag) {
            self.tags_to_add.push(tag.to_string());
        }

        if let Some(pos) = self.tags_to_remove.iter().position(|t| t == tag) {
            self.tags_to_remove.remove(pos);
        }
    }

    /// Queue a tag removal if the torrent currently carries the tag.
    pub fn remove_tag(&mut self, current_tags: &[String], tag: &str) {
        if current_tags.iter().any(|t| t == tag) && !self.tags_to_remove.iter().any(|t| t == tag) {
            self.tags_to_remove.push(tag.to_string());
        }

        if let Some(pos) = self.tags_to_add.iter().position(|t| t == tag) {
            self.tags_to_add.remove(pos);
        }
    }

    /// Queue an addition or a removal depending on whether the tag
    /// should be present.
    pub fn set_tag(&mut self, current_tags: &[String], tag: &str, present: bool) {
        if present {
            self.add_tag(current_tags, tag);
        } else {
            self.remove_tag(current_tags, tag);
        }
    }

    pub fn tags_to_add(&self) -> &[String] {
        &self.tags_to_add
    }

    pub fn tags_to_remove(&self) -> &[String] {
        &self.tags_to_remove
    }

    /// True when applying this plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.tags_to_add.is_empty()
            && self.tags_to_remove.is_empty()
            && self.upload_limit.is_none()
            && !self.clear_category
    }
}
