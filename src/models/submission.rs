// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::question::Question;

/// One answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerEntry {
    pub id: i64,
    #[serde(default)]
    pub answer: String,
}

/// The answers blob a student submits, grouped by question type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmittedAnswers {
    #[serde(default)]
    pub mcq: Vec<AnswerEntry>,
    #[serde(default)]
    pub descriptive: Vec<AnswerEntry>,
}

impl SubmittedAnswers {
    pub fn is_empty(&self) -> bool {
        self.mcq.is_empty() && self.descriptive.is_empty()
    }
}

/// The questions a submission was scored against, frozen at submit time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    #[serde(default)]
    pub mcq: Vec<Question>,
    #[serde(default)]
    pub descriptive: Vec<Question>,
}

/// Represents the 'submissions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub token: String,
    pub student_id: i64,
    pub student_name: String,
    pub answers: Json<SubmittedAnswers>,
    pub questions: Json<QuestionSnapshot>,
    pub score: f64,
    pub total_marks: f64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub token: String,
    pub student_id: i64,
    pub student_name: String,
    pub answers: SubmittedAnswers,
    pub questions: QuestionSnapshot,
    pub score: f64,
    pub total_marks: f64,
}

/// DTO for joining a test by token.
#[derive(Debug, Deserialize)]
pub struct JoinTestRequest {
    pub token: String,
}

/// A student's personal draw from the pool.
#[derive(Debug, Serialize)]
pub struct JoinTestResponse {
    pub mcqs: Vec<crate::models::question::PublicQuestion>,
    pub descriptive: Vec<crate::models::question::PublicQuestion>,
    pub token: String,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    pub token: String,
    #[serde(default)]
    pub answers: SubmittedAnswers,
}

/// Aggregated row for displaying the leaderboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: i64,
    pub rank: usize,
    pub student_name: String,
    pub score: f64,
    pub total_marks: f64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub class_average: f64,
    pub total_questions: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherResultsResponse {
    pub submissions: Vec<Submission>,
    pub class_average: f64,
}
