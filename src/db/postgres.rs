// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    note::{NewNote, Note},
    question::{NewQuestion, Question},
    submission::{NewSubmission, Submission},
    test_config::{NewTestConfig, TestConfig},
    user::{NewUser, User},
};

const USER_COLUMNS: &str = "id, username, password, role, email, created_at";
const QUESTION_COLUMNS: &str = "id, token, type, question, options, correct_answer, correct_index, \
     marks, context, difficulty, subject, pdf_content, created_at";
const TEST_COLUMNS: &str =
    "id, token, teacher_id, desired_mcqs, desired_descriptive, subject, created_at";
const SUBMISSION_COLUMNS: &str = "id, token, student_id, student_name, answers, questions, score, \
     total_marks, submitted_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, role, email) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(format!("Username '{}' already exists", user.username))
            }
            _ => StoreError::from(e),
        })
    }

    async fn create_pool(&self, note: NewNote, questions: Vec<NewQuestion>) -> StoreResult<Vec<Question>> {
        let mut tx = self.pool.begin().await?;

        let mut saved = Vec::with_capacity(questions.len());
        for q in questions {
            let row = sqlx::query_as::<_, Question>(&format!(
                r#"
                INSERT INTO questions
                    (token, type, question, options, correct_answer, correct_index,
                     marks, context, difficulty, subject, pdf_content)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING {QUESTION_COLUMNS}
                "#
            ))
            .bind(&q.token)
            .bind(q.question_type.as_str())
            .bind(&q.question)
            .bind(Json(&q.options))
            .bind(&q.correct_answer)
            .bind(q.correct_index)
            .bind(q.marks)
            .bind(&q.context)
            .bind(&q.difficulty)
            .bind(&q.subject)
            .bind(&q.pdf_content)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        sqlx::query(
            "INSERT INTO notes (token, content, input_type, subject, file_name) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&note.token)
        .bind(&note.content)
        .bind(&note.input_type)
        .bind(&note.subject)
        .bind(&note.file_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_note(&self, token: &str) -> StoreResult<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, token, content, input_type, subject, file_name, created_at
            FROM notes
            WHERE token = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn questions_by_token(&self, token: &str) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE token = $1 ORDER BY id"
        ))
        .bind(token)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn count_questions(&self, token: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_test(&self, test: NewTestConfig) -> StoreResult<TestConfig> {
        let row = sqlx::query_as::<_, TestConfig>(&format!(
            r#"
            INSERT INTO tests (token, teacher_id, desired_mcqs, desired_descriptive, subject)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(&test.token)
        .bind(test.teacher_id)
        .bind(test.desired_mcqs)
        .bind(test.desired_descriptive)
        .bind(&test.subject)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_latest_test(&self, token: &str) -> StoreResult<Option<TestConfig>> {
        let row = sqlx::query_as::<_, TestConfig>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE token = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn tests_by_teacher(&self, teacher_id: i64) -> StoreResult<Vec<TestConfig>> {
        let rows = sqlx::query_as::<_, TestConfig>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE teacher_id = $1 ORDER BY created_at, id"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<Submission> {
        let row = sqlx::query_as::<_, Submission>(&format!(
            r#"
            INSERT INTO submissions
                (token, student_id, student_name, answers, questions, score, total_marks)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(&submission.token)
        .bind(submission.student_id)
        .bind(&submission.student_name)
        .bind(Json(&submission.answers))
        .bind(Json(&submission.questions))
        .bind(submission.score)
        .bind(submission.total_marks)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn submissions_by_token(&self, token: &str) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE token = $1 ORDER BY score DESC, submitted_at, id"
        ))
        .bind(token)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn submissions_by_student(&self, student_id: i64) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE student_id = $1 ORDER BY submitted_at DESC, id DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
