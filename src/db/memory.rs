// src/db/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    note::{NewNote, Note},
    question::{NewQuestion, Question},
    submission::{NewSubmission, Submission},
    test_config::{NewTestConfig, TestConfig},
    user::{NewUser, User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    notes: Vec<Note>,
    questions: Vec<Question>,
    tests: Vec<TestConfig>,
    submissions: Vec<Submission>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store with the same ordering guarantees as `PgStore`.
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let wanted = username.to_lowercase();
        Ok(tables
            .users
            .iter()
            .find(|u| u.username.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let wanted = user.username.to_lowercase();
        if tables.users.iter().any(|u| u.username.to_lowercase() == wanted) {
            return Err(StoreError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let row = User {
            id: tables.next_id(),
            username: user.username,
            password: user.password_hash,
            role: user.role.as_str().to_string(),
            email: user.email,
            created_at: Utc::now(),
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn create_pool(&self, note: NewNote, questions: Vec<NewQuestion>) -> StoreResult<Vec<Question>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let mut saved = Vec::with_capacity(questions.len());
        for q in questions {
            let row = Question {
                id: tables.next_id(),
                token: q.token,
                question_type: q.question_type.as_str().to_string(),
                question: q.question,
                options: Json(q.options),
                correct_answer: q.correct_answer,
                correct_index: q.correct_index,
                marks: q.marks,
                context: q.context,
                difficulty: q.difficulty,
                subject: q.subject,
                pdf_content: q.pdf_content,
                created_at: now,
            };
            saved.push(row);
        }
        tables.questions.extend(saved.iter().cloned());

        let note = Note {
            id: tables.next_id(),
            token: note.token,
            content: note.content,
            input_type: note.input_type,
            subject: note.subject,
            file_name: note.file_name,
            created_at: now,
        };
        tables.notes.push(note);

        Ok(saved)
    }

    async fn find_note(&self, token: &str) -> StoreResult<Option<Note>> {
        let tables = self.tables.read().await;
        Ok(tables.notes.iter().rev().find(|n| n.token == token).cloned())
    }

    async fn questions_by_token(&self, token: &str) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.token == token)
            .cloned()
            .collect())
    }

    async fn count_questions(&self, token: &str) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().filter(|q| q.token == token).count() as i64)
    }

    async fn create_test(&self, test: NewTestConfig) -> StoreResult<TestConfig> {
        let mut tables = self.tables.write().await;
        let row = TestConfig {
            id: tables.next_id(),
            token: test.token,
            teacher_id: test.teacher_id,
            desired_mcqs: test.desired_mcqs,
            desired_descriptive: test.desired_descriptive,
            subject: test.subject,
            created_at: Utc::now(),
        };
        tables.tests.push(row.clone());
        Ok(row)
    }

    async fn find_latest_test(&self, token: &str) -> StoreResult<Option<TestConfig>> {
        let tables = self.tables.read().await;
        Ok(tables.tests.iter().rev().find(|t| t.token == token).cloned())
    }

    async fn tests_by_teacher(&self, teacher_id: i64) -> StoreResult<Vec<TestConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tests
            .iter()
            .filter(|t| t.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn create_submission(&self, submission: NewSubmission) -> StoreResult<Submission> {
        let mut tables = self.tables.write().await;
        let row = Submission {
            id: tables.next_id(),
            token: submission.token,
            student_id: submission.student_id,
            student_name: submission.student_name,
            answers: Json(submission.answers),
            questions: Json(submission.questions),
            score: submission.score,
            total_marks: submission.total_marks,
            submitted_at: Utc::now(),
        };
        tables.submissions.push(row.clone());
        Ok(row)
    }

    async fn submissions_by_token(&self, token: &str) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Submission> = tables
            .submissions
            .iter()
            .filter(|s| s.token == token)
            .cloned()
            .collect();
        // Stable sort keeps insertion order (earlier submission first) among equal scores.
        rows.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(rows)
    }

    async fn submissions_by_student(&self, student_id: i64) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .iter()
            .rev()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }
}
