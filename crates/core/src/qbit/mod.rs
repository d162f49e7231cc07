//! Download-client collaborator: snapshot fetching and plan application.

mod dry_run;
mod qbittorrent;
mod types;

pub use dry_run::DryRunApplier;
pub use qbittorrent::QBittorrentClient;
pub use types::{
    parse_tags, FileEntry, PlanApplier, QbitError, SnapshotBatch, SnapshotSource, TorrentRecord,
    TorrentSnapshot, TrackerMessage, TRACKER_STATUS_NOT_WORKING,
};
