use async_trait::async_trait;
use crate::history::{ ConversationStore, StoreError };
use crate::models::chat::{ generate_id, Conversation, Message };

/// Synthesizes conversations on every call and keeps nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct EphemeralConversationStore;

#[async_trait]
impl ConversationStore for EphemeralConversationStore {
    async fn get(&self, conversation_id: &str) -> Option<Conversation> {
        Some(Conversation::empty(conversation_id))
    }

    async fn list(&self) -> Vec<Conversation> {
        Vec::new()
    }

    async fn create(&self) -> Conversation {
        Conversation::empty(generate_id("conv"))
    }

    async fn append(&self, _conversation_id: &str, _message: Message) -> Result<(), StoreError> {
        Ok(())
    }
}
