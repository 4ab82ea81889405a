use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::domain::ConversationBranchState;

use super::{BranchStateStore, StoreError};

/// File-backed branch state, one JSON blob per conversation.
#[derive(Clone)]
pub struct FileBranchStateStore {
    base_path: PathBuf,
}

impl FileBranchStateStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn state_path(&self, conversation_id: Uuid) -> PathBuf {
        self.base_path.join(format!("{}.json", conversation_id))
    }
}

#[async_trait]
impl BranchStateStore for FileBranchStateStore {
    async fn save_state(&self, state: &ConversationBranchState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self.state_path(state.metadata.conversation_id);
        let contents = serde_json::to_string_pretty(state)?;

        fs::write(&path, contents).await?;

        Ok(())
    }

    async fn load_state(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<ConversationBranchState>, StoreError> {
        let path = self.state_path(conversation_id);

        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).await?;
        let state: ConversationBranchState = serde_json::from_str(&contents)?;

        Ok(Some(state))
    }

    async fn delete_state(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        let path = self.state_path(conversation_id);

        if path.exists() {
            fs::remove_file(&path).await?;
        }

        Ok(())
    }
}
