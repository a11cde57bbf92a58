//! Client side of the relay: GraphQL transport wiring and the chat session
//! that drives it.

pub mod session;

use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::{ de::DeserializeOwned, Deserialize, Serialize };
use serde_json::{ json, Value };
use std::env;
use thiserror::Error;
use url::Url;

use crate::models::chat::{ ChatResponse, Message, SendMessageInput };

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "http://localhost:8787/graphql";

/// Stands in for an error body that could not be read.
pub const UNREADABLE_BODY: &str = "<unreadable body>";

pub const SEND_MESSAGE: &str =
    "mutation SendMessage($input: SendMessageInput!) { sendMessage(input: $input) { id message } }";

pub const GET_CONVERSATION_HISTORY: &str =
    "query GetConversationHistory($conversationId: String!) { conversation(id: $conversationId) { id messages { id content role timestamp } } }";

pub const CREATE_CONVERSATION: &str = "mutation CreateConversation { createConversation { id } }";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid GraphQL endpoint '{0}': {1}")]
    InvalidEndpoint(String, url::ParseError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GraphQL endpoint returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("GraphQL response carried no data")]
    MissingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Vec<Value>,
}

/// Both halves of a GraphQL response are kept, even when `errors` is present.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    pub fn into_data(self) -> Result<T, ClientError> {
        if !self.errors.is_empty() {
            return Err(ClientError::GraphQl(self.errors.into_iter().map(|e| e.message).collect()));
        }
        self.data.ok_or(ClientError::MissingData)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageData {
    send_message: ChatResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationData {
    create_conversation: ConversationRef,
}

#[derive(Deserialize)]
struct ConversationHistoryData {
    conversation: Option<ConversationHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationHistory {
    pub id: String,
    pub messages: Vec<Message>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a> {
    query: &'a str,
    operation_name: &'a str,
    variables: Value,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
}

impl ClientConfig {
    /// Reads `GRAPHQL_ENDPOINT`, falling back to the local dev server.
    pub fn from_env() -> Self {
        Self::from_endpoint(env::var("GRAPHQL_ENDPOINT").ok())
    }

    /// Unset or blank endpoints fall back to the local dev server.
    pub fn from_endpoint(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_GRAPHQL_ENDPOINT.to_string());
        Self { endpoint }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string() }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    endpoint: Url,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e|
            ClientError::InvalidEndpoint(config.endpoint.clone(), e)
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self { http, endpoint })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value
    ) -> Result<GraphQlResponse<T>, ClientError> {
        debug!("GraphQL {} -> {}", operation_name, self.endpoint);
        let resp = self.http
            .post(self.endpoint.clone())
            .json(&(GraphQlRequest { query, operation_name, variables }))
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Could not read GraphQL error body: {}", e);
                    UNREADABLE_BODY.to_string()
                }
            };
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        Ok(resp.json::<GraphQlResponse<T>>().await?)
    }

    pub async fn send_message(&self, input: &SendMessageInput) -> Result<ChatResponse, ClientError> {
        let resp: GraphQlResponse<SendMessageData> = self.execute(
            "SendMessage",
            SEND_MESSAGE,
            json!({ "input": input })
        ).await?;
        Ok(resp.into_data()?.send_message)
    }

    pub async fn create_conversation(&self) -> Result<ConversationRef, ClientError> {
        let resp: GraphQlResponse<CreateConversationData> = self.execute(
            "CreateConversation",
            CREATE_CONVERSATION,
            json!({})
        ).await?;
        Ok(resp.into_data()?.create_conversation)
    }

    pub async fn conversation_history(
        &self,
        conversation_id: &str
    ) -> Result<Option<ConversationHistory>, ClientError> {
        let resp: GraphQlResponse<ConversationHistoryData> = self.execute(
            "GetConversationHistory",
            GET_CONVERSATION_HISTORY,
            json!({ "conversationId": conversation_id })
        ).await?;
        Ok(resp.into_data()?.conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_kept_alongside_data() {
        let raw = json!({
            "data": { "sendMessage": null },
            "errors": [{ "message": "Failed to process message", "path": ["sendMessage"] }]
        });
        let resp: GraphQlResponse<Value> = serde_json::from_value(raw).unwrap();
        assert!(resp.data.is_some());
        assert_eq!(resp.errors.len(), 1);
        assert_eq!(resp.errors[0].path, vec![json!("sendMessage")]);

        match resp.into_data().unwrap_err() {
            ClientError::GraphQl(messages) => {
                assert_eq!(messages, vec!["Failed to process message".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn null_data_without_errors_is_missing_data() {
        let resp: GraphQlResponse<Value> = serde_json::from_value(json!({ "data": null })).unwrap();
        assert!(matches!(resp.into_data(), Err(ClientError::MissingData)));
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        let err = ApiClient::new(ClientConfig { endpoint: "not a url".into() }).err().unwrap();
        assert!(matches!(err, ClientError::InvalidEndpoint(..)));
    }

    #[test]
    fn default_endpoint_points_at_local_server() {
        let client = ApiClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8787/graphql");
    }

    #[test]
    fn unset_or_blank_endpoint_falls_back_to_local_server() {
        assert_eq!(ClientConfig::from_endpoint(None).endpoint, DEFAULT_GRAPHQL_ENDPOINT);
        assert_eq!(ClientConfig::from_endpoint(Some("   ".into())).endpoint, DEFAULT_GRAPHQL_ENDPOINT);
        assert_eq!(
            ClientConfig::from_endpoint(Some(" https://chat.example.com/graphql ".into())).endpoint,
            "https://chat.example.com/graphql"
        );
    }

    #[tokio::test]
    async fn error_status_keeps_the_body() {
        use axum::{ http::StatusCode, routing::post, Router };

        let app = Router::new().route(
            "/graphql",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") })
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = ApiClient::new(ClientConfig::from_endpoint(Some(format!("http://{}/graphql", addr))))
            .unwrap();
        match client.create_conversation().await.unwrap_err() {
            ClientError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn history_messages_parse_from_the_wire_shape() {
        let raw = json!({
            "conversation": {
                "id": "conv_1_abc",
                "messages": [
                    { "id": "m1", "content": "hi", "role": "user", "timestamp": "2024-05-01T12:00:00.000Z" }
                ]
            }
        });
        let data: ConversationHistoryData = serde_json::from_value(raw).unwrap();
        let history = data.conversation.unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].role, crate::models::chat::Role::User);
    }
}
