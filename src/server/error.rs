use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use serde_json::json;
use thiserror::Error;

/// Failures the HTTP layer reports itself, outside of GraphQL responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not Found" })),
            AppError::BadRequest(message) =>
                (StatusCode::BAD_REQUEST, json!({ "error": "Bad Request", "message": message })),
            AppError::Internal(message) =>
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error", "message": message }),
                ),
        };
        (status, Json(body)).into_response()
    }
}
