//! In-memory checkpoint storage

use super::poison_err;
use crate::adapters::database::traits::CheckpointStorage;
use crate::core::backfill::cursor::{BackfillCheckpoint, BackfillPass};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStorage {
    checkpoints: RwLock<HashMap<BackfillPass, BackfillCheckpoint>>,
}

impl InMemoryCheckpointStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStorage for InMemoryCheckpointStorage {
    async fn load_checkpoint(&self, pass: BackfillPass) -> Result<Option<BackfillCheckpoint>> {
        let checkpoints = self.checkpoints.read().map_err(poison_err)?;
        Ok(checkpoints.get(&pass).cloned())
    }

    async fn save_checkpoint(&self, checkpoint: &BackfillCheckpoint) -> Result<()> {
        self.checkpoints
            .write()
            .map_err(poison_err)?
            .insert(checkpoint.pass, checkpoint.clone());
        Ok(())
    }

    async fn get_all_checkpoints(&self) -> Result<Vec<BackfillCheckpoint>> {
        let checkpoints = self.checkpoints.read().map_err(poison_err)?;
        let mut all: Vec<_> = checkpoints.values().cloned().collect();
        all.sort_by_key(|c| c.pass.as_str());
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backfill::cursor::{BackfillCheckpointBuilder, CheckpointStatus, Cursor};

    #[tokio::test]
    async fn test_save_replaces_per_pass() {
        let storage = InMemoryCheckpointStorage::new();
        assert!(storage
            .load_checkpoint(BackfillPass::Treatments)
            .await
            .unwrap()
            .is_none());

        let first = BackfillCheckpointBuilder::new(BackfillPass::Treatments)
            .status(CheckpointStatus::InProgress)
            .build();
        storage.save_checkpoint(&first).await.unwrap();

        let second = BackfillCheckpointBuilder::new(BackfillPass::Treatments)
            .cursor(Cursor::new(5, "x"))
            .status(CheckpointStatus::Completed)
            .build();
        storage.save_checkpoint(&second).await.unwrap();

        let loaded = storage
            .load_checkpoint(BackfillPass::Treatments)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, CheckpointStatus::Completed);
        assert_eq!(storage.get_all_checkpoints().await.unwrap().len(), 1);
    }
}
