// src/db/mod.rs

//! Persistence seam.
//!
//! Handlers only see the [`Store`] trait. `PgStore` backs production;
//! `MemoryStore` backs tests and database-less development runs.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    note::{NewNote, Note},
    question::{NewQuestion, Question},
    submission::{NewSubmission, Submission},
    test_config::{NewTestConfig, TestConfig},
    user::{NewUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DynStore = Arc<dyn Store>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> StoreResult<()>;

    /// Case-insensitive username lookup.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Persists a generated pool and its source note atomically.
    async fn create_pool(&self, note: NewNote, questions: Vec<NewQuestion>) -> StoreResult<Vec<Question>>;
    async fn find_note(&self, token: &str) -> StoreResult<Option<Note>>;
    /// All questions under a token, in insertion order.
    async fn questions_by_token(&self, token: &str) -> StoreResult<Vec<Question>>;
    async fn count_questions(&self, token: &str) -> StoreResult<i64>;

    async fn create_test(&self, test: NewTestConfig) -> StoreResult<TestConfig>;
    /// Newest test configuration for a token.
    async fn find_latest_test(&self, token: &str) -> StoreResult<Option<TestConfig>>;
    async fn tests_by_teacher(&self, teacher_id: i64) -> StoreResult<Vec<TestConfig>>;

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<Submission>;
    /// Submissions for a token, highest score first, earlier submission breaking ties.
    async fn submissions_by_token(&self, token: &str) -> StoreResult<Vec<Submission>>;
    /// A student's submissions, newest first.
    async fn submissions_by_student(&self, student_id: i64) -> StoreResult<Vec<Submission>>;
}
