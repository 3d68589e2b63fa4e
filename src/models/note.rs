// src/models/note.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'notes' table: the raw content a question pool was generated from.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub token: String,
    pub content: String,
    /// 'text' or 'pdf'.
    pub input_type: String,
    pub subject: String,
    pub file_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub token: String,
    pub content: String,
    pub input_type: String,
    pub subject: String,
    pub file_name: Option<String>,
}
