use clap::Parser;
use std::time::Duration;
use crate::llm::{ LlmConfig, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8787")]
    pub server_addr: String,

    /// Environment tag reported by the liveness endpoint.
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Comma-separated list of origins allowed to call the API. Any origin is allowed when unset.
    #[arg(long, env = "ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,

    // --- Chat LLM Provider Args ---
    /// API Key for the OpenAI chat completion API.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Full URL of the chat completion endpoint.
    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_CHAT_URL)]
    pub chat_base_url: String,

    /// Model name for chat completion.
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Upper bound on generated tokens per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1000")]
    pub max_tokens: u32,

    /// Sampling temperature sent with every request.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Deadline in seconds for a single upstream call.
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_secs: u64,

    // --- History Store Args ---
    /// Conversation store type (ephemeral, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "ephemeral")]
    pub history_type: String,
}

impl Args {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: Some(self.openai_api_key.clone()).filter(|k| !k.trim().is_empty()),
            completion_model: Some(self.chat_model.clone()),
            base_url: Some(self.chat_base_url.clone()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Trimmed, non-empty entries of `allowed_origins`. Empty means any origin.
    pub fn allowed_origin_list(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
