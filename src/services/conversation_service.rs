use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Conversation, Message, MessageRole};
use crate::notify::{NotificationSink, Toast};
use crate::stores::{BranchStateStore, ConversationStore, MessageStore};

use super::branch_service::BranchService;
use super::error::Result;

/// Glue between the chat view and the backend stores: conversation CRUD,
/// message sending, and the branch-aware message feed.
pub struct ConversationService {
    conversation_store: Arc<dyn ConversationStore>,
    message_store: Arc<dyn MessageStore>,
    branch_service: Arc<BranchService>,
    state_store: Arc<dyn BranchStateStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ConversationService {
    pub fn new(
        conversation_store: Arc<dyn ConversationStore>,
        message_store: Arc<dyn MessageStore>,
        branch_service: Arc<BranchService>,
        state_store: Arc<dyn BranchStateStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            conversation_store,
            message_store,
            branch_service,
            state_store,
            notifier,
        }
    }

    pub async fn create_conversation(
        &self,
        title: String,
        model: String,
        provider: String,
    ) -> Result<Conversation> {
        let conversation = Conversation::new(title, model, provider);
        self.conversation_store
            .create_conversation(&conversation)
            .await?;
        Ok(conversation)
    }

    pub async fn get_conversation(&self, conversation_id: Uuid) -> Result<Conversation> {
        Ok(self
            .conversation_store
            .get_conversation(conversation_id)
            .await?)
    }

    pub async fn list_conversations(&self, limit: usize) -> Result<Vec<Conversation>> {
        Ok(self.conversation_store.list_conversations(limit).await?)
    }

    pub async fn update_title(&self, conversation_id: Uuid, title: String) -> Result<()> {
        Ok(self
            .conversation_store
            .update_title(conversation_id, title)
            .await?)
    }

    /// Delete a conversation together with its branch state. Branch
    /// metadata lives exactly as long as the conversation does.
    pub async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()> {
        self.conversation_store
            .delete_conversation(conversation_id)
            .await?;
        self.branch_service.remove_conversation(conversation_id);
        self.state_store.delete_state(conversation_id).await?;
        Ok(())
    }

    /// Persist a message and append it to the active branch's line.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: String,
    ) -> Result<Message> {
        let message = Message::new(conversation_id, role, content);

        if let Err(err) = self.message_store.create_message(&message).await {
            self.notifier.notify(Toast::error("Failed to send message"));
            return Err(err.into());
        }

        self.branch_service
            .record_message(conversation_id, message.message_id);

        Ok(message)
    }

    /// Messages the chat view should display: the active branch's line when
    /// the conversation is forked, the full creation-order history otherwise.
    /// Ids whose message has since been deleted from the store are skipped.
    pub async fn visible_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let messages = self.message_store.list_messages(conversation_id).await?;

        match self.branch_service.active_branch_message_ids(conversation_id) {
            Some(ids) => {
                let mut by_id: HashMap<Uuid, Message> = messages
                    .into_iter()
                    .map(|m| (m.message_id, m))
                    .collect();
                Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
            }
            None => Ok(messages),
        }
    }

    /// Save the conversation's branch state through the blob store.
    pub async fn save_branch_state(&self, conversation_id: Uuid) -> Result<()> {
        self.branch_service
            .persist(conversation_id, self.state_store.as_ref())
            .await
    }

    /// Reload previously saved branch state. Returns false when none exists.
    pub async fn load_branch_state(&self, conversation_id: Uuid) -> Result<bool> {
        self.branch_service
            .restore(conversation_id, self.state_store.as_ref())
            .await
    }
}
