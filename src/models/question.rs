// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

pub const MCQ_OPTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Descriptive,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Descriptive => "descriptive",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(QuestionType::Mcq),
            "descriptive" => Ok(QuestionType::Descriptive),
            other => Err(format!("Unknown question type '{}'", other)),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// Pool token the question was generated under.
    pub token: String,

    /// 'mcq' or 'descriptive'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    pub question: String,

    /// Answer options for MCQs. Empty for descriptive questions.
    pub options: Json<Vec<String>>,

    /// The correct option (MCQ) or the reference answer (descriptive).
    pub correct_answer: String,

    pub correct_index: i32,

    pub marks: f64,

    /// Source sentence the question was generated from.
    pub context: Option<String>,

    pub difficulty: Option<String>,

    pub subject: String,

    /// Extracted PDF text, kept only on descriptive questions from PDF uploads.
    #[serde(skip_serializing)]
    pub pdf_content: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Question {
    pub fn kind(&self) -> Option<QuestionType> {
        self.question_type.parse().ok()
    }

    /// Whether the generated question is usable in a test.
    ///
    /// Generators sometimes echo their prompt ("Generate a clear MCQ ...") or
    /// produce fragments, so every pool is filtered before it is shown or drawn from.
    pub fn is_valid(&self) -> bool {
        let text = self.question.trim();
        let text_ok = !text.is_empty()
            && !text.starts_with("Generate")
            && text.chars().count() > 10
            && text.ends_with('?');
        if !text_ok {
            return false;
        }

        match self.kind() {
            Some(QuestionType::Mcq) => {
                self.options.len() == MCQ_OPTION_COUNT
                    && self.options.iter().all(|opt| opt.chars().count() > 2)
                    && !self.correct_answer.is_empty()
                    && self.options.contains(&self.correct_answer)
            }
            Some(QuestionType::Descriptive) => !self.correct_answer.trim().is_empty(),
            None => false,
        }
    }

    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            question_type: self.question_type.clone(),
            question: self.question.clone(),
            options: self.options.0.clone(),
            marks: self.marks,
            difficulty: self.difficulty.clone(),
            subject: self.subject.clone(),
        }
    }
}

/// Splits a pool into its valid MCQs and valid descriptive questions, logging what was dropped.
pub fn partition_valid(questions: Vec<Question>) -> (Vec<Question>, Vec<Question>) {
    let mut mcqs = Vec::new();
    let mut descriptive = Vec::new();

    for question in questions {
        if !question.is_valid() {
            tracing::warn!(
                "Filtered out invalid {} question {}: {}",
                question.question_type,
                question.id,
                question.question
            );
            continue;
        }
        match question.kind() {
            Some(QuestionType::Mcq) => mcqs.push(question),
            Some(QuestionType::Descriptive) => descriptive.push(question),
            None => {}
        }
    }

    (mcqs, descriptive)
}

/// Insert payload for a generated question.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub token: String,
    pub question_type: QuestionType,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub correct_index: i32,
    pub marks: f64,
    pub context: Option<String>,
    pub difficulty: Option<String>,
    pub subject: String,
    pub pdf_content: Option<String>,
}

/// DTO for sending a question to a student (excludes answer, context and source text).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question: String,
    pub options: Vec<String>,
    pub marks: f64,
    pub difficulty: Option<String>,
    pub subject: String,
}

/// Teacher view of a token's valid question pool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPoolResponse {
    pub mcqs: Vec<Question>,
    pub descriptive: Vec<Question>,
    #[serde(rename = "totalMCQs")]
    pub total_mcqs: usize,
    pub total_descriptive: usize,
    pub subject: String,
}
