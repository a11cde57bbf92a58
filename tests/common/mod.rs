//! Shared fixtures: a canned chat-completion upstream and a relay wired to it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{ Arc, Mutex };

use axum::{ extract::State, http::StatusCode, routing::post, Json, Router };
use chat_relay::cli::Args;
use chat_relay::graphql::build_schema;
use chat_relay::history::create_conversation_store;
use chat_relay::llm::chat::new_client;
use chat_relay::server::Server;
use clap::Parser;
use serde_json::{ json, Value };
use tokio::net::TcpListener;

#[derive(Clone)]
struct UpstreamState {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Chat-completion endpoint that answers every call with the same status and body.
pub struct MockUpstream {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockUpstream {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = UpstreamState { status, body, requests: requests.clone() };
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub async fn replying(content: &str) -> Self {
        Self::start(
            StatusCode::OK,
            json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
        ).await
    }

    pub fn url(&self) -> String {
        format!("http://{}/v1/chat/completions", self.addr)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn completions(State(state): State<UpstreamState>, Json(body): Json<Value>) -> (
    StatusCode,
    Json<Value>,
) {
    state.requests.lock().unwrap().push(body);
    (state.status, Json(state.body.clone()))
}

pub fn args(upstream_url: &str, extra: &[&str]) -> Args {
    args_with_key(upstream_url, "sk-test", extra)
}

pub fn args_with_key(upstream_url: &str, api_key: &str, extra: &[&str]) -> Args {
    let mut argv = vec![
        "chat-relay",
        "--openai-api-key",
        api_key,
        "--chat-base-url",
        upstream_url,
        "--environment",
        "test",
        "--request-timeout-secs",
        "5"
    ];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

pub fn relay(args: Args) -> Router {
    let chat_client = new_client(&args.llm_config()).unwrap();
    let store = create_conversation_store(&args).unwrap();
    let schema = build_schema(store);
    Server::new(args.server_addr.clone(), schema, chat_client, args).router()
}

/// Serves the relay on an ephemeral port and returns its GraphQL URL.
pub async fn serve_relay(args: Args) -> String {
    let app = relay(args);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/graphql", addr)
}
