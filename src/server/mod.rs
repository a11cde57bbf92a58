pub mod api;
pub mod error;

use crate::cli::Args;
use crate::graphql::ChatSchema;
use crate::llm::chat::ChatClient;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use log::{ info, warn };

pub struct Server {
    addr: String,
    schema: ChatSchema,
    chat_client: Arc<dyn ChatClient>,
    args: Args,
}

impl Server {
    pub fn new(
        addr: String,
        schema: ChatSchema,
        chat_client: Arc<dyn ChatClient>,
        args: Args,
    ) -> Self {
        if args.allowed_origin_list().is_empty() {
            warn!("ALLOWED_ORIGINS not set. Cross-origin requests are accepted from any origin.");
        }
        Self {
            addr,
            schema,
            chat_client,
            args,
        }
    }

    pub fn router(&self) -> axum::Router {
        let state = api::AppState {
            schema: self.schema.clone(),
            chat_client: self.chat_client.clone(),
            environment: self.args.environment.clone(),
        };
        api::router(state, &self.args.allowed_origin_list())
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let listener = TcpListener::bind(addr).await.map_err(|e|
            format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
        )?;
        info!("HTTP server listening on: http://{}", listener.local_addr()?);
        info!("GraphQL endpoint: http://{}{}", addr, api::GRAPHQL_PATH);

        axum::serve(listener, self.router()).with_graceful_shutdown(shutdown_signal()).await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
