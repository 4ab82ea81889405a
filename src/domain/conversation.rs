use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: Uuid,
    pub title: String,
    pub model: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: String, model: String, provider: String) -> Self {
        Conversation {
            conversation_id: Uuid::new_v4(),
            title,
            model,
            provider,
            created_at: Utc::now(),
        }
    }
}
