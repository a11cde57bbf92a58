//! GraphQL contract for the relay: conversation queries plus the `sendMessage`
//! and `createConversation` mutations.
//!
//! The chat client is not part of the schema data. The HTTP layer attaches it
//! to every request, so resolvers read it from the request context.

use async_graphql::{ Context, EmptySubscription, Object, Result, Schema };
use log::{ error, warn };
use std::sync::Arc;
use thiserror::Error;

use crate::history::ConversationStore;
use crate::llm::chat::{ ChatClient, HistoryEntry };
use crate::models::chat::{ generate_id, ChatResponse, Conversation, Message, Role, SendMessageInput };

pub type ChatSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// The only error a `sendMessage` caller ever sees.
#[derive(Debug, Error)]
#[error("Failed to process message")]
pub struct ProcessingError;

pub fn build_schema(store: Arc<dyn ConversationStore>) -> ChatSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).data(store).finish()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn conversation(&self, ctx: &Context<'_>, id: String) -> Result<Option<Conversation>> {
        let store = ctx.data::<Arc<dyn ConversationStore>>()?;
        Ok(store.get(&id).await)
    }

    async fn conversations(&self, ctx: &Context<'_>) -> Result<Vec<Conversation>> {
        let store = ctx.data::<Arc<dyn ConversationStore>>()?;
        Ok(store.list().await)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn send_message(
        &self,
        ctx: &Context<'_>,
        input: SendMessageInput
    ) -> Result<ChatResponse> {
        let store = ctx.data::<Arc<dyn ConversationStore>>()?;
        let client = ctx.data::<Arc<dyn ChatClient>>()?;

        let history = match &input.conversation_id {
            Some(id) =>
                store
                    .get(id).await
                    .map(|conversation| HistoryEntry::from_conversation(&conversation))
                    .unwrap_or_default(),
            None => Vec::new(),
        };

        let response = client.send_message(&input.message, &history).await.map_err(|e| {
            error!("Error in sendMessage resolver: {}", e);
            ProcessingError
        })?;

        if let Some(id) = &input.conversation_id {
            let turn = [
                Message::new(generate_id("user"), input.message.clone(), Role::User),
                Message::new(response.id.clone(), response.message.clone(), Role::Assistant),
            ];
            for message in turn {
                if let Err(e) = store.append(id, message).await {
                    warn!("Reply not recorded: {}", e);
                    break;
                }
            }
        }

        Ok(response)
    }

    async fn create_conversation(&self, ctx: &Context<'_>) -> Result<Conversation> {
        let store = ctx.data::<Arc<dyn ConversationStore>>()?;
        Ok(store.create().await)
    }
}
