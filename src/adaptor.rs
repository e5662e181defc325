//! Client for the AI service's streaming answer endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AdaptorError {
    #[error("AI service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI service returned status {0}")]
    UpstreamStatus(u16),
}

/// Chunked answer text as produced by the AI service. Dropping the stream
/// cancels the underlying connection.
pub type AnswerStream = BoxStream<'static, Result<Bytes, AdaptorError>>;

#[async_trait]
pub trait AnswerStreamClient {
    /// Open the chunked text stream for an in-flight answer generation.
    async fn open_answer_stream(&self, query_id: &str) -> Result<AnswerStream, AdaptorError>;
}

/// Production client backed by the AI service HTTP API.
pub struct AiServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl AiServiceClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnswerStreamClient for AiServiceClient {
    async fn open_answer_stream(&self, query_id: &str) -> Result<AnswerStream, AdaptorError> {
        let url = format!("{}/v1/asks/{}/streaming-result", self.base_url, query_id);
        debug!("Opening answer stream: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AdaptorError::UpstreamStatus(response.status().as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map_err(AdaptorError::from)
            .boxed())
    }
}
