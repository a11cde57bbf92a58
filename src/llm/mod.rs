pub mod chat;

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_model: None,
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Failures talking to the chat-completion endpoint. None of these are retried.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("OpenAI API error: {status} {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("No response from OpenAI")]
    NoChoices,

    #[error("Malformed OpenAI response: {0}")]
    Malformed(String),

    #[error("OpenAI request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OpenAI request timed out after {0:?}")]
    Timeout(Duration),
}
