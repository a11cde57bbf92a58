use async_trait::async_trait;
use log::{ debug, error, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::time::Duration;

use super::{ ChatClient, HistoryEntry };
use crate::llm::{
    ChatError,
    LlmConfig,
    UpstreamError,
    DEFAULT_CHAT_MODEL,
    DEFAULT_CHAT_URL,
};
use crate::models::chat::{ generate_id, ChatResponse };

pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Provide helpful, accurate, and engaging responses. You can use markdown formatting in your responses.";

/// Stands in for an error body that could not be read.
pub const UNREADABLE_BODY: &str = "<unreadable body>";

pub struct OpenAIChatClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout: Duration,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Option<Vec<OpenAIChoice>>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIReplyMessage,
}

#[derive(Deserialize)]
struct OpenAIReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.completion_model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout: config.request_timeout,
        })
    }

    fn build_messages(message: &str, history: &[HistoryEntry]) -> Vec<OpenAIMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(OpenAIMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        });
        messages.extend(
            history.iter().map(|entry| OpenAIMessage {
                role: entry.role.as_str().to_string(),
                content: entry.content.clone(),
            })
        );
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });
        messages
    }

    async fn post_completion(
        &self,
        api_key: &str,
        req: &OpenAIChatRequest
    ) -> Result<String, UpstreamError> {
        let resp = self.http
            .post(self.base_url.trim_end_matches('/'))
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .json(req)
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Could not read OpenAI error body: {}", e);
                    UNREADABLE_BODY.to_string()
                }
            };
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: OpenAIResponse = serde_json
            ::from_slice(&bytes)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        let choice = parsed.choices
            .and_then(|choices| choices.into_iter().next())
            .ok_or(UpstreamError::NoChoices)?;

        choice.message.content.ok_or_else(||
            UpstreamError::Malformed("first choice has no content".to_string())
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn send_message(
        &self,
        message: &str,
        history: &[HistoryEntry]
    ) -> Result<ChatResponse, ChatError> {
        let api_key = self.api_key
            .as_deref()
            .ok_or_else(|| ChatError::Configuration("OpenAI API key not configured".to_string()))?;

        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages: Self::build_messages(message, history),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        debug!(
            "Sending {} messages to {} (model {})",
            req.messages.len(),
            self.base_url,
            self.model
        );

        let content = match
            tokio::time::timeout(self.request_timeout, self.post_completion(api_key, &req)).await
        {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                error!("OpenAI API error: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                error!("OpenAI API call exceeded {:?}", self.request_timeout);
                return Err(UpstreamError::Timeout(self.request_timeout).into());
            }
        };

        Ok(ChatResponse {
            id: generate_id("ai"),
            message: content,
        })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use axum::{ extract::State, http::{ HeaderMap, StatusCode }, routing::post, Json, Router };
    use serde_json::{ json, Value };
    use std::sync::{ Arc, Mutex };
    use tokio::net::TcpListener;

    #[derive(Clone)]
    struct Canned {
        status: StatusCode,
        body: String,
        delay: Duration,
        seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn completions(
        State(canned): State<Canned>,
        headers: HeaderMap,
        Json(body): Json<Value>
    ) -> (StatusCode, String) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        canned.seen.lock().unwrap().push((auth, body));
        tokio::time::sleep(canned.delay).await;
        (canned.status, canned.body.clone())
    }

    async fn spawn_upstream(status: StatusCode, body: Value, delay: Duration) -> (String, Canned) {
        spawn_raw_upstream(status, body.to_string(), delay).await
    }

    async fn spawn_raw_upstream(status: StatusCode, body: String, delay: Duration) -> (String, Canned) {
        let canned = Canned {
            status,
            body,
            delay,
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(canned.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1/chat/completions", addr), canned)
    }

    fn client_for(url: String, timeout: Duration) -> OpenAIChatClient {
        OpenAIChatClient::from_config(
            &(LlmConfig {
                api_key: Some("sk-test".to_string()),
                base_url: Some(url),
                request_timeout: timeout,
                ..LlmConfig::default()
            })
        ).unwrap()
    }

    fn hello_reply() -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": "Hello" } }] })
    }

    #[test]
    fn messages_are_system_then_history_then_user() {
        let history = vec![
            HistoryEntry { role: Role::User, content: "first".into() },
            HistoryEntry { role: Role::Assistant, content: "second".into() }
        ];
        let messages = OpenAIChatClient::build_messages("third", &history);
        let roles: Vec<&str> = messages
            .iter()
            .map(|m| m.role.as_str())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].content, "first");
        assert_eq!(messages[2].content, "second");
        assert_eq!(messages[3].content, "third");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let (url, canned) = spawn_upstream(StatusCode::OK, hello_reply(), Duration::ZERO).await;
        let client = OpenAIChatClient::from_config(
            &(LlmConfig { base_url: Some(url), ..LlmConfig::default() })
        ).unwrap();

        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
        assert!(canned.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_api_key_counts_as_missing() {
        let client = OpenAIChatClient::from_config(
            &(LlmConfig { api_key: Some("   ".into()), ..LlmConfig::default() })
        ).unwrap();
        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[tokio::test]
    async fn first_choice_becomes_the_reply() {
        let (url, canned) = spawn_upstream(StatusCode::OK, hello_reply(), Duration::ZERO).await;
        let client = client_for(url, Duration::from_secs(5));

        let reply = client.send_message("hi", &[]).await.unwrap();
        assert_eq!(reply.message, "Hello");
        assert!(reply.id.starts_with("ai_"));

        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 1000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_body() {
        let (url, _) = spawn_upstream(
            StatusCode::UNAUTHORIZED,
            json!({ "error": { "message": "bad key" } }),
            Duration::ZERO
        ).await;
        let client = client_for(url, Duration::from_secs(5));

        match client.send_message("hi", &[]).await.unwrap_err() {
            ChatError::Upstream(UpstreamError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_upstream_error() {
        let (url, _) = spawn_upstream(StatusCode::OK, json!({ "choices": [] }), Duration::ZERO).await;
        let client = client_for(url, Duration::from_secs(5));

        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(UpstreamError::NoChoices)));
    }

    #[tokio::test]
    async fn absent_choices_is_an_upstream_error() {
        let (url, _) = spawn_upstream(StatusCode::OK, json!({ "id": "x" }), Duration::ZERO).await;
        let client = client_for(url, Duration::from_secs(5));

        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(UpstreamError::NoChoices)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let (url, _) = spawn_raw_upstream(
            StatusCode::OK,
            "<html>gateway hiccup</html>".to_string(),
            Duration::ZERO
        ).await;
        let client = client_for(url, Duration::from_secs(5));

        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn null_content_is_malformed() {
        let (url, _) = spawn_upstream(
            StatusCode::OK,
            json!({ "choices": [{ "message": { "role": "assistant", "content": null } }] }),
            Duration::ZERO
        ).await;
        let client = client_for(url, Duration::from_secs(5));

        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn slow_upstream_hits_the_deadline() {
        let (url, _) = spawn_upstream(StatusCode::OK, hello_reply(), Duration::from_secs(2)).await;
        let client = client_for(url, Duration::from_millis(100));

        let err = client.send_message("hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(UpstreamError::Timeout(_))));
    }
}
