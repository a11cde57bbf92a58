pub mod openai;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::sync::Arc;

use super::{ ChatError, LlmConfig };
use self::openai::OpenAIChatClient;
use crate::models::chat::{ ChatResponse, Conversation, Role };

/// One prior turn handed to the model ahead of the new user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn from_conversation(conversation: &Conversation) -> Vec<HistoryEntry> {
        conversation.messages
            .iter()
            .map(|msg| HistoryEntry {
                role: msg.role,
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `message` after `history` and returns the first reply.
    async fn send_message(
        &self,
        message: &str,
        history: &[HistoryEntry]
    ) -> Result<ChatResponse, ChatError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
