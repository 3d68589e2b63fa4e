// src/handlers/teacher.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    db::DynStore,
    error::AppError,
    models::{
        question::{Question, QuestionPoolResponse, QuestionType, partition_valid},
        submission::{Submission, TeacherResultsResponse},
        test_config::{CreateTestRequest, NewTestConfig},
    },
    services::scoring::{class_average, round2, similarity},
    utils::{extract::AppJson, jwt::Claims},
};

/// Returns the valid part of a token's question pool.
pub async fn get_questions(
    State(store): State<DynStore>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let pool = store.questions_by_token(&token).await?;
    let (mcqs, descriptive) = partition_valid(pool);

    if mcqs.is_empty() && descriptive.is_empty() {
        return Err(AppError::NotFound(
            "No valid questions found for this token".to_string(),
        ));
    }

    let subject = mcqs
        .first()
        .or(descriptive.first())
        .map(|q| q.subject.clone())
        .unwrap_or_else(|| "General".to_string());

    tracing::info!(
        "Fetched {} MCQs and {} descriptive questions for token {}",
        mcqs.len(),
        descriptive.len(),
        token
    );

    Ok(Json(QuestionPoolResponse {
        total_mcqs: mcqs.len(),
        total_descriptive: descriptive.len(),
        mcqs,
        descriptive,
        subject,
    }))
}

/// Clamps a requested count to what the pool can supply.
fn clamp_desired(requested: i64, available: usize, kind: QuestionType) -> i32 {
    let requested = requested.max(0);
    if requested as usize > available {
        tracing::warn!(
            "Adjusting desired {} count from {} to {} due to insufficient questions",
            kind,
            requested,
            available
        );
        return available as i32;
    }
    requested as i32
}

/// Creates a test over an existing pool.
///
/// Students joining the token later draw `desiredMCQs` and `desiredDescriptive`
/// questions at random from the valid pool.
pub async fn create_test(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        "Create test request - token: {}, desired MCQs: {}, desired descriptive: {}",
        req.token,
        req.desired_mcqs,
        req.desired_descriptive
    );

    let pool = store.questions_by_token(&req.token).await?;
    let (mcqs, descriptive) = partition_valid(pool);

    let desired_mcqs = clamp_desired(req.desired_mcqs, mcqs.len(), QuestionType::Mcq);
    let desired_descriptive =
        clamp_desired(req.desired_descriptive, descriptive.len(), QuestionType::Descriptive);

    if desired_mcqs == 0 || desired_descriptive == 0 {
        return Err(AppError::BadRequest(
            "Desired MCQs and Descriptive questions must be greater than 0".to_string(),
        ));
    }

    let subject = store
        .find_note(&req.token)
        .await?
        .map(|note| note.subject)
        .unwrap_or_else(|| "General".to_string());

    let test = store
        .create_test(NewTestConfig {
            token: req.token.clone(),
            teacher_id: claims.user_id()?,
            desired_mcqs,
            desired_descriptive,
            subject,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to create test: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!("Teacher {} created test for token {}", claims.username, test.token);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "testToken": test.token,
            "message": format!(
                "Test created with {} MCQs and {} descriptive questions to be randomly selected from the pool",
                test.desired_mcqs, test.desired_descriptive
            ),
        })),
    ))
}

/// All submissions for a token with the class average.
pub async fn get_results(
    State(store): State<DynStore>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = store.submissions_by_token(&token).await?;
    let class_average = class_average(submissions.iter().map(|s| s.score));

    Ok(Json(TeacherResultsResponse {
        submissions,
        class_average,
    }))
}

/// Submissions across every test the current teacher has created, newest first.
///
/// Served for older clients that list results without naming a token.
pub async fn get_all_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut tokens: Vec<String> = store
        .tests_by_teacher(claims.user_id()?)
        .await?
        .into_iter()
        .map(|test| test.token)
        .collect();
    tokens.sort();
    tokens.dedup();

    let mut submissions = Vec::new();
    for token in &tokens {
        submissions.extend(store.submissions_by_token(token).await?);
    }
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let class_average = class_average(submissions.iter().map(|s| s.score));

    Ok(Json(TeacherResultsResponse {
        submissions,
        class_average,
    }))
}

/// One student's answer to one question, as seen from the question's side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentPerformance {
    student_name: String,
    answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f64>,
    score: f64,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionHistory {
    #[serde(flatten)]
    question: Question,
    student_performance: Vec<StudentPerformance>,
}

fn performance_for(question: &Question, submissions: &[Submission]) -> Vec<StudentPerformance> {
    let kind = question.kind();
    let mut rows = Vec::new();

    for submission in submissions {
        let answers = match kind {
            Some(QuestionType::Mcq) => &submission.answers.mcq,
            Some(QuestionType::Descriptive) => &submission.answers.descriptive,
            None => continue,
        };

        // Only the first answer to a question is scored, so only it is reported.
        if let Some(entry) = answers.iter().find(|a| a.id == question.id) {
            let row = if kind == Some(QuestionType::Mcq) {
                let correct = entry.answer == question.correct_answer;
                StudentPerformance {
                    student_name: submission.student_name.clone(),
                    answer: entry.answer.clone(),
                    is_correct: Some(correct),
                    similarity: None,
                    score: if correct { question.marks } else { 0.0 },
                    submitted_at: submission.submitted_at,
                }
            } else {
                let sim = similarity(&entry.answer, &question.correct_answer);
                StudentPerformance {
                    student_name: submission.student_name.clone(),
                    answer: entry.answer.clone(),
                    is_correct: None,
                    similarity: Some(sim),
                    score: round2((sim * question.marks).min(question.marks)),
                    submitted_at: submission.submitted_at,
                }
            };
            rows.push(row);
        }
    }

    rows
}

/// Per-question breakdown of how every student answered.
pub async fn question_history(
    State(store): State<DynStore>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let questions = store.questions_by_token(&token).await?;
    let submissions = store.submissions_by_token(&token).await?;

    let history: Vec<QuestionHistory> = questions
        .into_iter()
        .map(|question| QuestionHistory {
            student_performance: performance_for(&question, &submissions),
            question,
        })
        .collect();

    Ok(Json(json!({ "history": history })))
}
