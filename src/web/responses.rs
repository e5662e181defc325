//! Read endpoints for thread responses.

use crate::{ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ListResponsesParams {
    /// When supplied, returns the newest `limit` responses first.
    pub limit: Option<i64>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/thread_responses/:id", get(get_thread_response))
        .route("/v1/threads/:thread_id/responses", get(list_thread_responses))
        .with_state(state)
}

async fn get_thread_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<crate::models::thread_responses::ThreadResponse>, ApiError> {
    debug!("Fetching thread response {}", id);
    let response = state.db.get_thread_response(id)?;
    Ok(Json(response))
}

async fn list_thread_responses(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<i64>,
    Query(params): Query<ListResponsesParams>,
) -> Result<Json<Vec<crate::models::thread_responses::ThreadResponse>>, ApiError> {
    if let Some(limit) = params.limit {
        if limit <= 0 {
            return Err(ApiError::BadRequest);
        }
    }
    debug!(
        "Listing responses for thread {} (limit: {:?})",
        thread_id, params.limit
    );
    let responses = state.db.get_responses_for_thread(thread_id, params.limit)?;
    Ok(Json(responses))
}
