pub mod accumulator;
pub mod adaptor;
pub mod config;
pub mod db;
pub mod models;
pub mod web;

use crate::accumulator::StreamContentRegistry;
use crate::adaptor::AnswerStreamClient;
use crate::db::{DBConnection, DBError};
use crate::models::thread_responses::ThreadResponsesError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

pub struct AppState {
    pub db: Arc<dyn DBConnection + Send + Sync>,
    pub answer_client: Arc<dyn AnswerStreamClient + Send + Sync>,
    pub stream_contents: StreamContentRegistry,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalServerError,

    #[error("Bad Request")]
    BadRequest,

    #[error("Resource not found")]
    NotFound,

    #[error("Thread response is not in streaming status")]
    NotStreaming,

    #[error("Thread response has no query id")]
    MissingQueryId,

    #[error("AI service unavailable")]
    UpstreamUnavailable,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotStreaming => StatusCode::CONFLICT,
            ApiError::MissingQueryId => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(ErrorResponse {
                status: status.as_u16(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<DBError> for ApiError {
    fn from(err: DBError) -> Self {
        match err {
            DBError::ThreadResponseError(ThreadResponsesError::ResponseNotFound) => {
                // expected for invalid ids, not worth an error log
                ApiError::NotFound
            }
            DBError::ThreadResponseError(ThreadResponsesError::ValidationError) => {
                ApiError::BadRequest
            }
            _ => {
                error!("Database error: {:?}", err);
                ApiError::InternalServerError
            }
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(web::responses::router(state.clone()))
        .merge(web::streaming::router(state))
        .layer(CorsLayer::permissive())
}
