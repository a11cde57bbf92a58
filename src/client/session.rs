use async_trait::async_trait;
use log::error;
use std::sync::atomic::{ AtomicBool, Ordering };
use tokio::sync::Mutex;

use super::{ ApiClient, ClientError };
use crate::models::chat::{ generate_id, ChatResponse, Message, Role, SendMessageInput };

pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your message. Please try again.";

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, input: SendMessageInput) -> Result<ChatResponse, ClientError>;
}

#[async_trait]
impl MessageSender for ApiClient {
    async fn send(&self, input: SendMessageInput) -> Result<ChatResponse, ClientError> {
        self.send_message(&input).await
    }
}

/// Local, append-only view of a chat plus an advisory busy flag.
///
/// Overlapping `send_message` calls are allowed. Each append takes the lock on
/// its own, so the list is ordered by when messages were appended.
pub struct ChatSession<S> {
    sender: S,
    conversation_id: Option<String>,
    messages: Mutex<Vec<Message>>,
    loading: AtomicBool,
}

impl<S: MessageSender> ChatSession<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            conversation_id: None,
            messages: Mutex::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Tags every outgoing message with `conversation_id`.
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Appends the user's message, asks the server for a reply and appends
    /// that too. A failed call appends a fixed apology instead.
    ///
    /// Returns the assistant message, or `None` when `content` is blank and
    /// nothing was sent.
    pub async fn send_message(&self, content: &str) -> Option<Message> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        self.push(Message::new(generate_id("user"), content, Role::User)).await;
        self.loading.store(true, Ordering::SeqCst);

        let input = SendMessageInput {
            message: content.to_string(),
            conversation_id: self.conversation_id.clone(),
        };
        let reply = match self.sender.send(input).await {
            Ok(resp) => Message::new(resp.id, resp.message, Role::Assistant),
            Err(e) => {
                error!("Error sending message: {}", e);
                Message::new(generate_id("error"), ERROR_REPLY, Role::Assistant)
            }
        };

        self.push(reply.clone()).await;
        self.loading.store(false, Ordering::SeqCst);
        Some(reply)
    }

    pub async fn clear_messages(&self) {
        self.messages.lock().await.clear();
    }

    async fn push(&self, message: Message) {
        self.messages.lock().await.push(message);
    }
}
