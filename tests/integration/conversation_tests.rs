// Integration tests for conversation operations and branch-aware reads
// Run with: cargo test --test integration

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use uuid::Uuid;

    use chat_branching::config::AppConfig;
    use chat_branching::domain::{Message, MessageRole};
    use chat_branching::notify::{LogSink, NotificationSink, Toast, ToastKind};
    use chat_branching::services::{BranchService, ConversationService, ServiceError};
    use chat_branching::stores::{BranchStateStore, InMemoryStore, MessageStore, StoreError};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "chat_branching=debug".into()),
            )
            .try_init();
    }

    fn test_config() -> AppConfig {
        AppConfig {
            root_branch_name: "main".to_string(),
            max_branches_per_conversation: 64,
            max_branch_depth: 32,
        }
    }

    fn setup() -> (Arc<InMemoryStore>, Arc<BranchService>, ConversationService) {
        init_tracing();

        let store = Arc::new(InMemoryStore::new());
        let branch_service = Arc::new(BranchService::new(store.clone(), test_config()));
        let conversation_service = ConversationService::new(
            store.clone(),
            store.clone(),
            branch_service.clone(),
            store.clone(),
            Arc::new(LogSink),
        );

        (store, branch_service, conversation_service)
    }

    #[tokio::test]
    async fn conversation_crud() {
        let (_store, _branches, service) = setup();

        let conversation = service
            .create_conversation(
                "Rust questions".to_string(),
                "gpt-4".to_string(),
                "openai".to_string(),
            )
            .await
            .unwrap();

        let fetched = service
            .get_conversation(conversation.conversation_id)
            .await
            .unwrap();
        assert_eq!(fetched.title, "Rust questions");
        assert_eq!(fetched.model, "gpt-4");

        service
            .update_title(conversation.conversation_id, "Borrowck questions".to_string())
            .await
            .unwrap();
        let fetched = service
            .get_conversation(conversation.conversation_id)
            .await
            .unwrap();
        assert_eq!(fetched.title, "Borrowck questions");

        let listed = service.list_conversations(10).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn unforked_conversation_shows_full_history() {
        let (_store, _branches, service) = setup();

        let conversation = service
            .create_conversation("Chat".to_string(), "gpt-4".to_string(), "openai".to_string())
            .await
            .unwrap();
        let c1 = conversation.conversation_id;

        let m1 = service
            .send_message(c1, MessageRole::User, "Hello".to_string())
            .await
            .unwrap();
        let m2 = service
            .send_message(c1, MessageRole::Assistant, "Hi there".to_string())
            .await
            .unwrap();

        let visible = service.visible_messages(c1).await.unwrap();
        assert_eq!(
            visible.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            vec![m1.message_id, m2.message_id]
        );
    }

    #[tokio::test]
    async fn new_messages_land_on_the_active_branch() {
        let (_store, branches, service) = setup();

        let conversation = service
            .create_conversation("Chat".to_string(), "gpt-4".to_string(), "openai".to_string())
            .await
            .unwrap();
        let c1 = conversation.conversation_id;

        let mut ids = Vec::new();
        for text in ["one", "two", "three"] {
            let message = service
                .send_message(c1, MessageRole::User, text.to_string())
                .await
                .unwrap();
            ids.push(message.message_id);
        }

        let alt = branches.create_branch(c1, "Alt", ids[1], None).await.unwrap();
        branches.switch_branch(c1, alt.branch_id).unwrap();

        // The next message extends the alternate line only.
        let m4 = service
            .send_message(c1, MessageRole::User, "four".to_string())
            .await
            .unwrap();

        let visible = service.visible_messages(c1).await.unwrap();
        assert_eq!(
            visible.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            vec![ids[0], ids[1], m4.message_id]
        );

        // Back on the main line the original history is intact.
        let root_id = branches.metadata(c1).unwrap().root_branch_id;
        branches.switch_branch(c1, root_id).unwrap();
        let visible = service.visible_messages(c1).await.unwrap();
        assert_eq!(
            visible.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            ids
        );
    }

    #[tokio::test]
    async fn deleting_a_conversation_clears_branch_state() {
        let (store, branches, service) = setup();

        let conversation = service
            .create_conversation("Chat".to_string(), "gpt-4".to_string(), "openai".to_string())
            .await
            .unwrap();
        let c1 = conversation.conversation_id;

        let m1 = service
            .send_message(c1, MessageRole::User, "Hello".to_string())
            .await
            .unwrap();
        branches.create_branch(c1, "Alt", m1.message_id, None).await.unwrap();
        service.save_branch_state(c1).await.unwrap();

        service.delete_conversation(c1).await.unwrap();

        assert!(branches.get_branch_tree(c1).is_empty());
        assert!(!service.load_branch_state(c1).await.unwrap());
        assert!(matches!(
            service.get_conversation(c1).await,
            Err(ServiceError::Store(StoreError::NotFound))
        ));
        assert!(store.load_state(c1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn branch_state_survives_a_restart() {
        let (store, branches, service) = setup();

        let conversation = service
            .create_conversation("Chat".to_string(), "gpt-4".to_string(), "openai".to_string())
            .await
            .unwrap();
        let c1 = conversation.conversation_id;

        let m1 = service
            .send_message(c1, MessageRole::User, "Hello".to_string())
            .await
            .unwrap();
        let alt = branches
            .create_branch(c1, "Alt", m1.message_id, None)
            .await
            .unwrap();
        branches.switch_branch(c1, alt.branch_id).unwrap();
        service.save_branch_state(c1).await.unwrap();

        // A fresh service stack over the same backend.
        let branches2 = Arc::new(BranchService::new(store.clone(), test_config()));
        let service2 = ConversationService::new(
            store.clone(),
            store.clone(),
            branches2.clone(),
            store.clone(),
            Arc::new(LogSink),
        );

        assert!(service2.load_branch_state(c1).await.unwrap());
        assert_eq!(branches2.active_branch_id(c1), Some(alt.branch_id));
        assert_eq!(
            serde_json::to_value(branches.snapshot(c1).unwrap()).unwrap(),
            serde_json::to_value(branches2.snapshot(c1).unwrap()).unwrap()
        );
    }

    #[tokio::test]
    async fn branch_state_blob_is_lossless() {
        let (_store, branches, service) = setup();

        let conversation = service
            .create_conversation("Chat".to_string(), "gpt-4".to_string(), "openai".to_string())
            .await
            .unwrap();
        let c1 = conversation.conversation_id;

        let m1 = service
            .send_message(c1, MessageRole::User, "Hello".to_string())
            .await
            .unwrap();
        branches
            .create_branch(c1, "Alt", m1.message_id, Some("a detour".to_string()))
            .await
            .unwrap();

        let state = branches.snapshot(c1).unwrap();
        let blob = serde_json::to_string(&state).unwrap();
        let decoded: chat_branching::domain::ConversationBranchState =
            serde_json::from_str(&blob).unwrap();

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::to_value(&decoded).unwrap()
        );
    }

    #[tokio::test]
    async fn deleted_messages_drop_out_of_the_feed() {
        let (store, branches, service) = setup();

        let conversation = service
            .create_conversation("Chat".to_string(), "gpt-4".to_string(), "openai".to_string())
            .await
            .unwrap();
        let c1 = conversation.conversation_id;

        let m1 = service
            .send_message(c1, MessageRole::User, "Hello".to_string())
            .await
            .unwrap();
        let m2 = service
            .send_message(c1, MessageRole::Assistant, "Hi".to_string())
            .await
            .unwrap();
        branches.create_branch(c1, "Alt", m2.message_id, None).await.unwrap();

        let fetched = store.get_message(c1, m1.message_id).await.unwrap();
        assert_eq!(fetched.content, "Hello");

        // The branch line still lists m1, but the feed skips the dead id.
        store.delete_message(c1, m1.message_id).await.unwrap();
        let visible = service.visible_messages(c1).await.unwrap();
        assert_eq!(
            visible.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            vec![m2.message_id]
        );
    }

    struct FailingMessageStore;

    #[async_trait]
    impl MessageStore for FailingMessageStore {
        async fn create_message(&self, _message: &Message) -> Result<(), StoreError> {
            Err(StoreError::InvalidData("backend offline".to_string()))
        }

        async fn get_message(&self, _c: Uuid, _m: Uuid) -> Result<Message, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list_messages(&self, _c: Uuid) -> Result<Vec<Message>, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list_message_ids(&self, _c: Uuid) -> Result<Vec<Uuid>, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn delete_message(&self, _c: Uuid, _m: Uuid) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        toasts: Mutex<Vec<Toast>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }
    }

    #[tokio::test]
    async fn failed_send_raises_a_toast() {
        init_tracing();

        let store = Arc::new(InMemoryStore::new());
        let branch_service = Arc::new(BranchService::new(store.clone(), test_config()));
        let sink = Arc::new(RecordingSink::default());
        let service = ConversationService::new(
            store.clone(),
            Arc::new(FailingMessageStore),
            branch_service,
            store.clone(),
            sink.clone(),
        );

        let result = service
            .send_message(Uuid::new_v4(), MessageRole::User, "Hello".to_string())
            .await;
        assert!(matches!(result, Err(ServiceError::Store(_))));

        let toasts = sink.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
    }
}
