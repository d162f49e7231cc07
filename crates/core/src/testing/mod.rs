//! Mock collaborators and fixtures for tests.

mod fixtures;
mod mock_plan_applier;
mod mock_snapshot_source;

pub use fixtures::TorrentFixture;
pub use mock_plan_applier::{AppliedPlan, MockPlanApplier};
pub use mock_snapshot_source::MockSnapshotSource;
