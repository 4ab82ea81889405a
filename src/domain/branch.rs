use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One alternate line of conversation history.
///
/// `message_ids` is a snapshot copy taken at fork time, not a live view of
/// the parent: messages appended to either side after the fork never cross
/// over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub conversation_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_branch_id: Option<Uuid>,
    pub fork_point_message_id: Option<Uuid>,
    pub message_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// The implicit root branch, holding the conversation's full message
    /// history at materialization time.
    pub fn new_root(conversation_id: Uuid, name: String, message_ids: Vec<Uuid>) -> Self {
        Branch {
            conversation_id,
            branch_id: Uuid::new_v4(),
            name,
            description: None,
            parent_branch_id: None,
            fork_point_message_id: None,
            message_ids,
            created_at: Utc::now(),
        }
    }

    /// A branch forked off `parent` at `fork_point_message_id`, with
    /// `message_ids` already cut to the shared prefix.
    pub fn new_child(
        parent: &Branch,
        name: String,
        description: Option<String>,
        fork_point_message_id: Uuid,
        message_ids: Vec<Uuid>,
    ) -> Self {
        Branch {
            conversation_id: parent.conversation_id,
            branch_id: Uuid::new_v4(),
            name,
            description,
            parent_branch_id: Some(parent.branch_id),
            fork_point_message_id: Some(fork_point_message_id),
            message_ids,
            created_at: Utc::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_branch_id.is_none()
    }

    pub fn contains_message(&self, message_id: Uuid) -> bool {
        self.message_ids.contains(&message_id)
    }
}

/// Per-conversation branch bookkeeping: which branch is the main line and
/// which one the chat view is currently reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationBranchMetadata {
    pub conversation_id: Uuid,
    pub root_branch_id: Uuid,
    pub active_branch_id: Uuid,
}

/// Serializable snapshot of a conversation's whole branch forest. This is
/// the blob that goes through the state store and must round-trip losslessly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationBranchState {
    pub metadata: ConversationBranchMetadata,
    pub branches: Vec<Branch>,
}
