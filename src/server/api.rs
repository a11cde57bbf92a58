use crate::graphql::ChatSchema;
use crate::llm::chat::ChatClient;
use crate::models::chat::iso_timestamp;
use crate::server::error::AppError;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use async_graphql::http::{ parse_query_string, GraphiQLSource };
use async_graphql_axum::{ GraphQLRequest, GraphQLResponse };
use axum::{
    routing::get,
    Router,
    Json,
    extract::{ RawQuery, Request, State },
    middleware::{ self, Next },
    response::{ Html, IntoResponse, Response },
    http::{ header::{ AUTHORIZATION, CONTENT_TYPE }, HeaderValue, Method },
};
use chrono::Utc;
use serde_json::{ json, Value };
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{ AllowOrigin, Any as AnyOrigin, CorsLayer };
use log::{ info, warn, error };

pub const GRAPHQL_PATH: &str = "/graphql";

#[derive(Clone)]
pub struct AppState {
    pub schema: ChatSchema,
    pub chat_client: Arc<dyn ChatClient>,
    pub environment: String,
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let routes = Router::new()
        .route("/", get(health_handler))
        .route(GRAPHQL_PATH, get(graphql_get_handler).post(graphql_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler);
    with_layers(routes, allowed_origins).with_state(state)
}

/// Panic capture, then request logging, then CORS as the outermost layer.
pub fn with_layers<S>(router: Router<S>, allowed_origins: &[String]) -> Router<S>
    where S: Clone + Send + Sync + 'static
{
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(log_requests))
        .layer(cors_layer(allowed_origins))
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(req).await;
    info!("{} {} -> {} ({:?})", method, path, response.status().as_u16(), started.elapsed());
    response
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(
        json!({
            "message": "AI Chat API is running!",
            "timestamp": iso_timestamp(&Utc::now()),
            "environment": state.environment,
        })
    )
}

async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    let request = req.into_inner().data(state.chat_client.clone());
    state.schema.execute(request).await.into()
}

async fn graphql_get_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery
) -> Result<Response, AppError> {
    let query = match query.filter(|q| !q.is_empty()) {
        Some(q) => q,
        None => {
            return Ok(Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish()).into_response());
        }
    };

    let request = parse_query_string(&query).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let response = state.schema.execute(request.data(state.chat_client.clone())).await;
    Ok(GraphQLResponse::from(response).into_response())
}

async fn not_found_handler() -> AppError {
    AppError::NotFound
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    error!("Server error: {}", message);
    AppError::Internal(message).into_response()
}
