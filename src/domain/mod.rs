pub mod branch;
pub mod conversation;
pub mod message;

pub use branch::{Branch, ConversationBranchMetadata, ConversationBranchState};
pub use conversation::Conversation;
pub use message::{Message, MessageRole};
