// src/models/test_config.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'tests' table.
/// A teacher's decision on how many questions of each kind a student draws from a pool.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub id: i64,
    pub token: String,
    pub teacher_id: i64,
    #[serde(rename = "desiredMCQs")]
    pub desired_mcqs: i32,
    pub desired_descriptive: i32,
    pub subject: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTestConfig {
    pub token: String,
    pub teacher_id: i64,
    pub desired_mcqs: i32,
    pub desired_descriptive: i32,
    pub subject: String,
}

/// DTO for creating a test over an existing pool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestRequest {
    pub token: String,
    #[serde(default, rename = "desiredMCQs")]
    pub desired_mcqs: i64,
    #[serde(default)]
    pub desired_descriptive: i64,
}
