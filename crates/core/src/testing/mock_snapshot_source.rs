//! Mock snapshot source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::qbit::{QbitError, SnapshotBatch, SnapshotSource};

/// Mock implementation of the SnapshotSource trait.
///
/// Serves a configurable batch and can simulate fetch failures to
/// exercise the fail-fast path.
#[derive(Debug, Default)]
pub struct MockSnapshotSource {
    batch: Arc<RwLock<SnapshotBatch>>,
    fail_next: Arc<RwLock<bool>>,
}

impl MockSnapshotSource {
    pub fn new(batch: SnapshotBatch) -> Self {
        Self {
            batch: Arc::new(RwLock::new(batch)),
            fail_next: Arc::new(RwLock::new(false)),
        }
    }

    /// Replace the batch served by the next fetch.
    pub async fn set_batch(&self, batch: SnapshotBatch) {
        *self.batch.write().await = batch;
    }

    /// Make the next fetch fail with a connection error.
    pub async fn fail_next_fetch(&self) {
        *self.fail_next.write().await = true;
    }
}

#[async_trait]
impl SnapshotSource for MockSnapshotSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_batch(&self) -> Result<SnapshotBatch, QbitError> {
        let mut fail = self.fail_next.write().await;
        if *fail {
            *fail = false;
            return Err(QbitError::ConnectionFailed("simulated".to_string()));
        }
        Ok(self.batch.read().await.clone())
    }
}
