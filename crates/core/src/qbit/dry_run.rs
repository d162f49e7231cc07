//! Logging-only plan applier. Dry-run mode by construction: wiring this
//! in place of the real client means no change ever reaches qBittorrent.

use async_trait::async_trait;
use tracing::info;

use crate::classify::UpdatePlan;

use super::{PlanApplier, QbitError};

/// Applier that logs what it would do and touches nothing.
#[derive(Debug, Default)]
pub struct DryRunApplier;

#[async_trait]
impl PlanApplier for DryRunApplier {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn apply(&self, hash: &str, plan: &UpdatePlan) -> Result<(), QbitError> {
        for tag in plan.tags_to_add() {
            info!("[DRY RUN] Would add tag '{}' to torrent {}", tag, hash);
        }
        for tag in plan.tags_to_remove() {
            info!("[DRY RUN] Would remove tag '{}' from torrent {}", tag, hash);
        }
        if let Some(limit) = plan.upload_limit {
            info!(
                "[DRY RUN] Would set upload limit to {} for torrent {}",
                limit, hash
            );
        }
        if plan.clear_category {
            info!("[DRY RUN] Would clear category on torrent {}", hash);
        }
        Ok(())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), QbitError> {
        for hash in hashes {
            info!(
                "[DRY RUN] Would remove torrent {} (delete_files: {})",
                hash, delete_files
            );
        }
        Ok(())
    }
}
