use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{Conversation, ConversationBranchState, Message};

use super::{BranchStateStore, ConversationStore, MessageStore, StoreError};

/// In-process backend implementing all three store traits. Backs the test
/// suite and embedded use where no external service is wired up.
#[derive(Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<Uuid, Conversation>>,
    // Keyed by conversation id; inner vec is creation order.
    messages: RwLock<HashMap<Uuid, Vec<Message>>>,
    branch_state: RwLock<HashMap<Uuid, ConversationBranchState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        if self.conversations.read().contains_key(&conversation_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        self.ensure_conversation(message.conversation_id)?;
        self.messages
            .write()
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn get_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, StoreError> {
        self.messages
            .read()
            .get(&conversation_id)
            .and_then(|msgs| msgs.iter().find(|m| m.message_id == message_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        self.ensure_conversation(conversation_id)?;
        Ok(self
            .messages
            .read()
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_message_ids(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.ensure_conversation(conversation_id)?;
        Ok(self
            .messages
            .read()
            .get(&conversation_id)
            .map(|msgs| msgs.iter().map(|m| m.message_id).collect())
            .unwrap_or_default())
    }

    async fn delete_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut messages = self.messages.write();
        let msgs = messages
            .get_mut(&conversation_id)
            .ok_or(StoreError::NotFound)?;
        let position = msgs
            .iter()
            .position(|m| m.message_id == message_id)
            .ok_or(StoreError::NotFound)?;
        msgs.remove(position);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.conversations
            .write()
            .insert(conversation.conversation_id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Conversation, StoreError> {
        self.conversations
            .read()
            .get(&conversation_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_conversations(&self, limit: usize) -> Result<Vec<Conversation>, StoreError> {
        let mut conversations: Vec<Conversation> =
            self.conversations.read().values().cloned().collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        conversations.truncate(limit);
        Ok(conversations)
    }

    async fn update_title(&self, conversation_id: Uuid, title: String) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write();
        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::NotFound)?;
        conversation.title = title;
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        self.conversations
            .write()
            .remove(&conversation_id)
            .ok_or(StoreError::NotFound)?;
        self.messages.write().remove(&conversation_id);
        Ok(())
    }
}

#[async_trait]
impl BranchStateStore for InMemoryStore {
    async fn save_state(&self, state: &ConversationBranchState) -> Result<(), StoreError> {
        self.branch_state
            .write()
            .insert(state.metadata.conversation_id, state.clone());
        Ok(())
    }

    async fn load_state(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<ConversationBranchState>, StoreError> {
        Ok(self.branch_state.read().get(&conversation_id).cloned())
    }

    async fn delete_state(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        self.branch_state.write().remove(&conversation_id);
        Ok(())
    }
}
