//! Answer stream relay: forwards in-progress answer chunks from the AI
//! service to the client while reconciling the durable thread response.
//!
//! The relay task owns the whole session: it pumps the upstream stream,
//! mirrors every chunk into the process-wide content registry, and on
//! whichever terminal event fires first (upstream end, client disconnect,
//! upstream failure) runs a single finalize-and-release pass. Reconciliation
//! happens after the client-facing stream has already closed, so a slow
//! store write never delays the done frame.

use crate::adaptor::AdaptorError;
use crate::models::thread_responses::{
    AnswerDetailPatch, AnswerStatus, DetailError,
};
use crate::{ApiError, AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Terminal frame emitted after the last upstream chunk.
const DONE_FRAME: &[u8] = b"data: {\"done\":true}\n\n";

const CLIENT_CHANNEL_BUFFER: usize = 64;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/v1/thread_responses/:id/answer/stream",
            get(stream_answer),
        )
        .with_state(state)
}

/// How a relay session ended.
enum SessionEnd {
    /// Upstream emitted end-of-stream; the client saw the done frame.
    Finished,
    /// Client went away before the upstream finished.
    Interrupted,
    /// Upstream failed mid-stream.
    Failed(AdaptorError),
}

/// GET /v1/thread_responses/:id/answer/stream
///
/// Precondition failures (missing response, wrong status, missing query id)
/// respond with a JSON error body before any streaming begins and leave no
/// side effects behind.
pub async fn stream_answer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let response = state.db.get_thread_response(id)?;

    let answer_detail = response.answer_detail.ok_or(ApiError::NotStreaming)?;
    if answer_detail.status != AnswerStatus::Streaming {
        debug!(
            "Rejecting answer stream for response {}: status is {:?}",
            id, answer_detail.status
        );
        return Err(ApiError::NotStreaming);
    }
    let query_id = answer_detail.query_id.ok_or(ApiError::MissingQueryId)?;

    let upstream = state
        .answer_client
        .open_answer_stream(&query_id)
        .await
        .map_err(|e| {
            error!("Failed to open answer stream for {}: {}", query_id, e);
            ApiError::UpstreamUnavailable
        })?;

    info!("Starting answer relay for response {} ({})", id, query_id);

    let (tx, rx) = mpsc::channel::<Bytes>(CLIENT_CHANNEL_BUFFER);
    tokio::spawn(relay_session(state.clone(), id, query_id, upstream, tx));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    let mut res = Response::new(body);
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(res)
}

/// Pump the upstream stream until a terminal event, then finalize.
///
/// Chunks are appended to the registry before being forwarded, so the
/// reconciled content always covers everything the client could have seen.
/// The loop breaks on exactly one terminal arm; dropping the upstream
/// stream cancels it before the finalize read, so no append can race the
/// read for this key.
async fn relay_session(
    state: Arc<AppState>,
    response_id: i64,
    query_id: String,
    mut upstream: crate::adaptor::AnswerStream,
    tx: mpsc::Sender<Bytes>,
) {
    let end = loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!("Client disconnected from answer stream {}", query_id);
                break SessionEnd::Interrupted;
            }
            chunk = upstream.next() => match chunk {
                Some(Ok(bytes)) => {
                    // raw bytes: chunk boundaries can split UTF-8 sequences
                    state.stream_contents.append(&query_id, &bytes);
                    if tx.send(bytes).await.is_err() {
                        debug!("Client channel closed mid-send for {}", query_id);
                        break SessionEnd::Interrupted;
                    }
                }
                Some(Err(e)) => {
                    warn!("Answer stream {} failed upstream: {}", query_id, e);
                    break SessionEnd::Failed(e);
                }
                None => {
                    // Best effort: the client may already be gone, which
                    // does not change the FINISHED outcome.
                    let _ = tx.send(Bytes::from_static(DONE_FRAME)).await;
                    break SessionEnd::Finished;
                }
            }
        }
    };

    drop(upstream);
    drop(tx);

    finalize(&state, response_id, &query_id, end).await;
}

/// Single best-effort reconciliation write, then unconditional release of
/// the registry entry. Store failures are logged, never re-raised: the
/// client stream is already closed.
async fn finalize(state: &AppState, response_id: i64, query_id: &str, end: SessionEnd) {
    let content = state.stream_contents.read(query_id);

    let patch = match &end {
        SessionEnd::Finished => AnswerDetailPatch {
            status: Some(AnswerStatus::Finished),
            content,
            ..Default::default()
        },
        SessionEnd::Interrupted => AnswerDetailPatch {
            status: Some(AnswerStatus::Interrupted),
            content,
            ..Default::default()
        },
        SessionEnd::Failed(e) => AnswerDetailPatch {
            status: Some(AnswerStatus::Failed),
            content,
            error: Some(DetailError {
                code: Some("ANSWER_STREAM_FAILED".to_string()),
                message: Some(e.to_string()),
                short_message: Some("Answer stream failed".to_string()),
                stacktrace: None,
            }),
            ..Default::default()
        },
    };

    let status = patch.status;
    match state.db.update_answer_detail(response_id, patch) {
        Ok(_) => info!(
            "Answer detail for response {} updated to {:?}",
            response_id, status
        ),
        Err(e) => error!(
            "Failed to update answer detail for response {}: {:?}",
            response_id, e
        ),
    }

    state.stream_contents.release(query_id);
}
