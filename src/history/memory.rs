use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::history::{ ConversationStore, StoreError };
use crate::models::chat::{ generate_id, Conversation, Message };

/// Keeps conversations for the lifetime of the process.
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations.read().await.get(conversation_id).cloned()
    }

    async fn list(&self) -> Vec<Conversation> {
        let mut all: Vec<Conversation> = self.conversations.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    async fn create(&self) -> Conversation {
        let conversation = Conversation::empty(generate_id("conv"));
        self.conversations.write().await.insert(conversation.id.clone(), conversation.clone());
        conversation
    }

    async fn append(&self, conversation_id: &str, message: Message) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))?;
        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        Ok(())
    }
}
