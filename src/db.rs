use crate::models::thread_responses::{
    AnswerDetailPatch, BreakdownDetail, ThreadResponse, ThreadResponsesError,
};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DBError {
    #[error("Thread response error: {0}")]
    ThreadResponseError(#[from] ThreadResponsesError),
    #[error("Connection pool error: {0}")]
    PoolError(#[from] diesel::r2d2::PoolError),
}

/// Storage boundary for the thread-response graph.
///
/// Kept behind a trait object so the relay and the read endpoints can be
/// exercised against an in-memory fake in tests.
pub trait DBConnection {
    fn get_thread_response(&self, response_id: i64) -> Result<ThreadResponse, DBError>;

    fn get_responses_for_thread(
        &self,
        thread_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ThreadResponse>, DBError>;

    fn update_answer_detail(
        &self,
        response_id: i64,
        patch: AnswerDetailPatch,
    ) -> Result<ThreadResponse, DBError>;

    fn update_breakdown_detail(
        &self,
        response_id: i64,
        detail: BreakdownDetail,
    ) -> Result<ThreadResponse, DBError>;
}

pub struct PostgresConnection {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl PostgresConnection {
    pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        Self { pool }
    }
}

impl DBConnection for PostgresConnection {
    fn get_thread_response(&self, response_id: i64) -> Result<ThreadResponse, DBError> {
        let mut conn = self.pool.get()?;
        ThreadResponse::get_by_id(&mut conn, response_id).map_err(DBError::from)
    }

    fn get_responses_for_thread(
        &self,
        thread_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ThreadResponse>, DBError> {
        let mut conn = self.pool.get()?;
        ThreadResponse::list_for_thread(&mut conn, thread_id, limit).map_err(DBError::from)
    }

    fn update_answer_detail(
        &self,
        response_id: i64,
        patch: AnswerDetailPatch,
    ) -> Result<ThreadResponse, DBError> {
        let mut conn = self.pool.get()?;
        ThreadResponse::update_answer_detail(&mut conn, response_id, &patch).map_err(DBError::from)
    }

    fn update_breakdown_detail(
        &self,
        response_id: i64,
        detail: BreakdownDetail,
    ) -> Result<ThreadResponse, DBError> {
        let mut conn = self.pool.get()?;
        ThreadResponse::update_breakdown_detail(&mut conn, response_id, &detail)
            .map_err(DBError::from)
    }
}

pub fn setup_db(url: &str) -> Arc<dyn DBConnection + Send + Sync> {
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(10)
        .build(manager)
        .expect("failed to create database pool");

    info!("Connected to Postgres");
    Arc::new(PostgresConnection::new(pool))
}
