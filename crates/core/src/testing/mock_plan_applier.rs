//! Mock plan applier for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::classify::UpdatePlan;
use crate::qbit::{PlanApplier, QbitError};

/// A recorded apply call for test assertions.
#[derive(Debug, Clone)]
pub struct AppliedPlan {
    pub hash: String,
    pub plan: UpdatePlan,
}

/// Mock implementation of the PlanApplier trait.
///
/// Records everything it is asked to do so tests can assert on the
/// exact update traffic.
#[derive(Debug, Default)]
pub struct MockPlanApplier {
    applied: Arc<RwLock<Vec<AppliedPlan>>>,
    removed: Arc<RwLock<Vec<(Vec<String>, bool)>>>,
}

impl MockPlanApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded apply calls.
    pub async fn applied(&self) -> Vec<AppliedPlan> {
        self.applied.read().await.clone()
    }

    /// All recorded remove_torrents calls.
    pub async fn removed(&self) -> Vec<(Vec<String>, bool)> {
        self.removed.read().await.clone()
    }
}

#[async_trait]
impl PlanApplier for MockPlanApplier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn apply(&self, hash: &str, plan: &UpdatePlan) -> Result<(), QbitError> {
        self.applied.write().await.push(AppliedPlan {
            hash: hash.to_string(),
            plan: plan.clone(),
        });
        Ok(())
    }

    async fn remove_torrents(
        &self,
        hashes: &[String],
        delete_files: bool,
    ) -> Result<(), QbitError> {
        self.removed
            .write()
            .await
            .push((hashes.to_vec(), delete_files));
        Ok(())
    }
}
