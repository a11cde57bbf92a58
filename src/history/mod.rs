mod ephemeral;
mod memory;

pub use ephemeral::EphemeralConversationStore;
pub use memory::MemoryConversationStore;

use async_trait::async_trait;
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;
use crate::cli::Args;
use crate::models::chat::{ Conversation, Message };

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Conversation '{0}' not found")]
    NotFound(String),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Option<Conversation>;

    async fn list(&self) -> Vec<Conversation>;

    async fn create(&self) -> Conversation;

    async fn append(&self, conversation_id: &str, message: Message) -> Result<(), StoreError>;
}

pub fn create_conversation_store(
    args: &Args
) -> Result<Arc<dyn ConversationStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "ephemeral" => Ok(Arc::new(EphemeralConversationStore)),
        "memory" => {
            warn!("Conversations are kept in process memory and are lost on restart.");
            Ok(Arc::new(MemoryConversationStore::default()))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_conversation_store(
    args: &Args
) -> Result<Arc<dyn ConversationStore>, Box<dyn Error + Send + Sync>> {
    info!("Conversations will be handled by the '{}' store", args.history_type);
    create_conversation_store(args)
}
