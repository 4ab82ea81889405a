pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Conversation, ConversationBranchState, Message};

pub use file::FileBranchStateStore;
pub use memory::InMemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found")]
    NotFound,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The backend that owns message content. Branch bookkeeping only ever
/// touches message ids; content stays behind this boundary.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, message: &Message) -> Result<(), StoreError>;

    async fn get_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, StoreError>;

    /// All messages of a conversation, in creation order.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError>;

    /// Creation-ordered message ids; used to materialize the implicit root
    /// branch on a conversation's first fork.
    async fn list_message_ids(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn delete_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), StoreError>;
}

/// The backend that owns conversation records.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError>;

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Conversation, StoreError>;

    /// Most recently created conversations first.
    async fn list_conversations(&self, limit: usize) -> Result<Vec<Conversation>, StoreError>;

    async fn update_title(&self, conversation_id: Uuid, title: String) -> Result<(), StoreError>;

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError>;
}

/// Opaque persistence channel for branch state, keyed by conversation id.
#[async_trait]
pub trait BranchStateStore: Send + Sync {
    async fn save_state(&self, state: &ConversationBranchState) -> Result<(), StoreError>;

    async fn load_state(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<ConversationBranchState>, StoreError>;

    async fn delete_state(&self, conversation_id: Uuid) -> Result<(), StoreError>;
}
