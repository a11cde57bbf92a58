pub mod models;
pub mod server;
pub mod graphql;
pub mod llm;
pub mod cli;
pub mod history;
pub mod client;

use cli::Args;
use log::{ info, warn };
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let llm_config = args.llm_config();

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Environment: {}", args.environment);
    info!("Chat Endpoint: {}", args.chat_base_url);
    info!("Chat Model: {}", args.chat_model);
    info!("Max Tokens: {}", args.max_tokens);
    info!("Temperature: {}", args.temperature);
    info!("Upstream Timeout: {}s", args.request_timeout_secs);
    info!("History Store Type: {}", args.history_type);
    info!("Allowed Origins: {}", args.allowed_origins.as_deref().unwrap_or("*"));
    info!("-------------------------");

    if llm_config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set. sendMessage will fail until it is configured.");
    }

    let chat_client = llm::chat::new_client(&llm_config)?;
    info!(
        "Chat client configured: Model={}, BaseURL={}",
        chat_client.get_model(),
        chat_client.get_base_url()
    );
    let store = history::initialize_conversation_store(&args)?;
    let schema = graphql::build_schema(store);

    let server = Server::new(args.server_addr.clone(), schema, chat_client, args.clone());
    server.run().await?;

    Ok(())
}
