use chat_relay::client::session::ChatSession;
use chat_relay::client::{ ApiClient, ClientConfig };
use chat_relay::models::chat::Role;
use clap::Parser;
use dotenv::dotenv;
use log::{ error, info };
use std::error::Error;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };

/// Terminal chat front-end for the relay's GraphQL API.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// GraphQL endpoint of the relay server. Defaults to GRAPHQL_ENDPOINT, then the local dev server.
    #[arg(long)]
    endpoint: Option<String>,

    /// Ask the server for a new conversation and tag every message with its id.
    #[arg(long, default_value = "false")]
    new_conversation: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = CliArgs::parse();

    let client = match args.endpoint {
        Some(endpoint) => ApiClient::new(ClientConfig::from_endpoint(Some(endpoint)))?,
        None => ApiClient::from_env()?,
    };
    info!("Using GraphQL endpoint: {}", client.endpoint());

    let mut session = ChatSession::new(client.clone());
    if args.new_conversation {
        let conversation = client.create_conversation().await?;
        println!("Conversation: {}", conversation.id);
        session = session.with_conversation_id(conversation.id);
    }

    println!("Type a message and press Enter. Commands: /clear, /history, /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/quit" => {
                break;
            }
            "/clear" => {
                session.clear_messages().await;
                println!("(cleared)");
            }
            "/history" => {
                for message in session.messages().await {
                    let who = match message.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("[{}] {}: {}", message.timestamp.format("%H:%M:%S"), who, message.content);
                }
                if let Some(id) = session.conversation_id() {
                    match client.conversation_history(id).await {
                        Ok(Some(remote)) => {
                            println!("(server holds {} messages)", remote.messages.len());
                        }
                        Ok(None) => println!("(server does not know conversation {})", id),
                        Err(e) => {
                            error!("Failed to fetch conversation history: {}", e);
                            println!("(could not reach the server for conversation {})", id);
                        }
                    }
                }
            }
            text => {
                if let Some(reply) = session.send_message(text).await {
                    println!("{}", reply.content);
                }
            }
        }
    }

    Ok(())
}
