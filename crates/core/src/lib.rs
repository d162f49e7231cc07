pub mod classify;
pub mod config;
pub mod hardlink;
pub mod manager;
pub mod qbit;
pub mod testing;

pub use classify::{
    Assessment, ClassificationFacts, CrossSeedState, DeleteState, RunContext, UpdatePlan,
};
pub use config::{
    load_config, load_config_from_str, load_tracker_profiles, validate_config, Config,
    ConfigError, EngineOptions, QBittorrentConfig, TrackerProfile,
};
pub use hardlink::{DisabledHardlinkChecker, FsHardlinkChecker, HardlinkChecker};
pub use manager::{ApplyStats, CycleError, CycleReport, SweepOutcome, TorrentManager};
pub use qbit::{
    DryRunApplier, PlanApplier, QBittorrentClient, QbitError, SnapshotBatch, SnapshotSource,
    TorrentRecord, TorrentSnapshot,
};
