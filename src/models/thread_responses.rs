use crate::models::schema::thread_responses;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Error types
#[derive(Error, Debug)]
pub enum ThreadResponsesError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("Thread response not found")]
    ResponseNotFound,
    #[error("Validation error")]
    ValidationError,
    #[error("Corrupt stored detail: {0}")]
    DataCorruption(String),
}

/// Lifecycle status shared by all detail blocks.
///
/// Wire form matches the UI contract: `STREAMING`, `FINISHED`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerStatus {
    NotStarted,
    Streaming,
    Finished,
    Failed,
    Interrupted,
}

impl AnswerStatus {
    /// Terminal statuses are the only ones under which persisted content
    /// is authoritative.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnswerStatus::Finished | AnswerStatus::Failed | AnswerStatus::Interrupted
        )
    }
}

/// Structured error carried inside a detail block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Vec<String>>,
}

/// AI generated text-based answer detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        rename = "numRowsUsedInLLM",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_rows_used_in_llm: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DetailError>,
}

impl Default for AnswerDetail {
    fn default() -> Self {
        Self {
            query_id: None,
            status: AnswerStatus::NotStarted,
            content: None,
            num_rows_used_in_llm: None,
            error: None,
        }
    }
}

/// One step of a stepwise SQL breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailStep {
    pub summary: String,
    pub sql: String,
    pub cte_name: String,
}

/// Stepwise breakdown detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DetailError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<DetailStep>>,
}

/// Chart detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DetailError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_schema: Option<Value>,
}

// ============================================================================
// Detail codec
// ============================================================================

/// Stored form of a JSON-bearing detail column at the storage boundary.
///
/// Native JSON backends hand back a structured value; text backends (and
/// legacy double-encoded rows) hand back the JSON text. Both arms must
/// decode to the identical logical value.
#[derive(Debug, Clone)]
pub enum StoredDetail {
    Text(String),
    Structured(Value),
}

impl From<Value> for StoredDetail {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => StoredDetail::Text(s),
            other => StoredDetail::Structured(other),
        }
    }
}

/// Serialize a detail for storage. Absent stays absent; present values are
/// serialized to their canonical JSON form unconditionally, never wrapping
/// an already-encoded text form.
pub fn encode_detail<T: Serialize>(
    detail: Option<&T>,
) -> Result<Option<Value>, ThreadResponsesError> {
    match detail {
        None => Ok(None),
        Some(d) => serde_json::to_value(d)
            .map(Some)
            .map_err(|e| ThreadResponsesError::DataCorruption(e.to_string())),
    }
}

/// Decode a stored detail column value.
///
/// Text is parsed as JSON; structured values are deserialized directly and
/// never re-parsed as text, so decode is idempotent across encodings. An
/// empty/whitespace text value and JSON null both normalize to `None`. A
/// non-empty text value that is not valid JSON is data corruption and is
/// surfaced, never swallowed.
pub fn decode_detail<T: DeserializeOwned>(
    stored: Option<StoredDetail>,
) -> Result<Option<T>, ThreadResponsesError> {
    match stored {
        None => Ok(None),
        Some(StoredDetail::Text(s)) => {
            if s.trim().is_empty() {
                return Ok(None);
            }
            serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| ThreadResponsesError::DataCorruption(e.to_string()))
        }
        Some(StoredDetail::Structured(Value::Null)) => Ok(None),
        Some(StoredDetail::Structured(v)) => serde_json::from_value(v)
            .map(Some)
            .map_err(|e| ThreadResponsesError::DataCorruption(e.to_string())),
    }
}

// ============================================================================
// Thread responses
// ============================================================================

/// Raw row as stored; detail columns are undecoded JSON.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = thread_responses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ThreadResponseRow {
    pub id: i64,
    pub thread_id: i64,
    pub view_id: Option<i64>,
    pub question: String,
    pub sql: String,
    pub answer_detail: Option<Value>,
    pub breakdown_detail: Option<Value>,
    pub chart_detail: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded thread response as callers see it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub id: i64,
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_id: Option<i64>,
    pub question: String,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_detail: Option<AnswerDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown_detail: Option<BreakdownDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_detail: Option<ChartDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadResponseRow {
    /// Decode the JSON-bearing columns through the detail codec.
    pub fn decode(self) -> Result<ThreadResponse, ThreadResponsesError> {
        Ok(ThreadResponse {
            id: self.id,
            thread_id: self.thread_id,
            view_id: self.view_id,
            question: self.question,
            sql: self.sql,
            answer_detail: decode_detail(self.answer_detail.map(StoredDetail::from))?,
            breakdown_detail: decode_detail(self.breakdown_detail.map(StoredDetail::from))?,
            chart_detail: decode_detail(self.chart_detail.map(StoredDetail::from))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Partial update for the answer detail; fields left as `None` are
/// preserved on the stored value.
#[derive(Debug, Clone, Default)]
pub struct AnswerDetailPatch {
    pub query_id: Option<String>,
    pub status: Option<AnswerStatus>,
    pub content: Option<String>,
    pub num_rows_used_in_llm: Option<i64>,
    pub error: Option<DetailError>,
}

impl AnswerDetailPatch {
    pub fn is_empty(&self) -> bool {
        self.query_id.is_none()
            && self.status.is_none()
            && self.content.is_none()
            && self.num_rows_used_in_llm.is_none()
            && self.error.is_none()
    }

    /// Merge the supplied subfields into an existing detail.
    pub fn apply(&self, detail: &mut AnswerDetail) {
        if let Some(query_id) = &self.query_id {
            detail.query_id = Some(query_id.clone());
        }
        if let Some(status) = self.status {
            detail.status = status;
        }
        if let Some(content) = &self.content {
            detail.content = Some(content.clone());
        }
        if let Some(num_rows) = self.num_rows_used_in_llm {
            detail.num_rows_used_in_llm = Some(num_rows);
        }
        if let Some(error) = &self.error {
            detail.error = Some(error.clone());
        }
    }
}

impl ThreadResponse {
    pub fn get_by_id(
        conn: &mut PgConnection,
        response_id: i64,
    ) -> Result<ThreadResponse, ThreadResponsesError> {
        thread_responses::table
            .find(response_id)
            .select(ThreadResponseRow::as_select())
            .first::<ThreadResponseRow>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ThreadResponsesError::ResponseNotFound,
                _ => ThreadResponsesError::DatabaseError(e),
            })?
            .decode()
    }

    /// Responses for a thread, newest first when a limit is supplied.
    pub fn list_for_thread(
        conn: &mut PgConnection,
        thread_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ThreadResponse>, ThreadResponsesError> {
        let mut query = thread_responses::table
            .filter(thread_responses::thread_id.eq(thread_id))
            .select(ThreadResponseRow::as_select())
            .into_boxed();

        if let Some(limit) = limit {
            query = query
                .order(thread_responses::created_at.desc())
                .limit(limit);
        }

        query
            .load::<ThreadResponseRow>(conn)
            .map_err(ThreadResponsesError::DatabaseError)?
            .into_iter()
            .map(ThreadResponseRow::decode)
            .collect()
    }

    /// Merge a partial answer detail into the stored row.
    ///
    /// The current detail is decoded, patched, re-encoded through the
    /// codec, and written back in a single row update.
    pub fn update_answer_detail(
        conn: &mut PgConnection,
        response_id: i64,
        patch: &AnswerDetailPatch,
    ) -> Result<ThreadResponse, ThreadResponsesError> {
        if patch.is_empty() {
            return Err(ThreadResponsesError::ValidationError);
        }

        let current = Self::get_by_id(conn, response_id)?;
        let mut detail = current.answer_detail.unwrap_or_default();
        patch.apply(&mut detail);

        let encoded = encode_detail(Some(&detail))?;
        diesel::update(thread_responses::table.find(response_id))
            .set((
                thread_responses::answer_detail.eq(encoded),
                thread_responses::updated_at.eq(diesel::dsl::now),
            ))
            .returning(ThreadResponseRow::as_returning())
            .get_result::<ThreadResponseRow>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ThreadResponsesError::ResponseNotFound,
                _ => ThreadResponsesError::DatabaseError(e),
            })?
            .decode()
    }

    /// Replace the breakdown detail wholesale, same codec discipline.
    pub fn update_breakdown_detail(
        conn: &mut PgConnection,
        response_id: i64,
        detail: &BreakdownDetail,
    ) -> Result<ThreadResponse, ThreadResponsesError> {
        let encoded = encode_detail(Some(detail))?;
        diesel::update(thread_responses::table.find(response_id))
            .set((
                thread_responses::breakdown_detail.eq(encoded),
                thread_responses::updated_at.eq(diesel::dsl::now),
            ))
            .returning(ThreadResponseRow::as_returning())
            .get_result::<ThreadResponseRow>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ThreadResponsesError::ResponseNotFound,
                _ => ThreadResponsesError::DatabaseError(e),
            })?
            .decode()
    }
}
