// src/handlers/student.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use rand::seq::SliceRandom;

use crate::{
    db::DynStore,
    error::AppError,
    models::{
        question::{PublicQuestion, Question, partition_valid},
        submission::{JoinTestRequest, JoinTestResponse, NewSubmission, SubmitTestRequest},
    },
    services::scoring::score_submission,
    utils::{extract::AppJson, jwt::Claims},
};

/// Draws `count` distinct questions uniformly at random.
fn draw(pool: &[Question], count: usize) -> Vec<PublicQuestion> {
    let mut rng = rand::thread_rng();
    pool.choose_multiple(&mut rng, count)
        .map(Question::to_public)
        .collect()
}

/// Joins a test by token and returns this student's random draw of questions.
pub async fn join_test(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<JoinTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let test = store
        .find_latest_test(&req.token)
        .await?
        .ok_or(AppError::NotFound("Invalid token".to_string()))?;

    let pool = store.questions_by_token(&req.token).await?;
    let (mcqs, descriptive) = partition_valid(pool);

    let want_mcqs = test.desired_mcqs.max(0) as usize;
    let want_descriptive = test.desired_descriptive.max(0) as usize;
    if mcqs.len() < want_mcqs || descriptive.len() < want_descriptive {
        return Err(AppError::BadRequest(
            "Not enough valid questions available in the pool".to_string(),
        ));
    }

    tracing::info!("Student {} joined test {}", claims.username, req.token);

    Ok(Json(JoinTestResponse {
        mcqs: draw(&mcqs, want_mcqs),
        descriptive: draw(&descriptive, want_descriptive),
        token: req.token,
    }))
}

/// Scores a student's answers, stores the submission and returns the score.
pub async fn submit_test(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let pool = store.questions_by_token(&req.token).await?;
    if pool.is_empty() {
        return Err(AppError::NotFound("Invalid token".to_string()));
    }

    let sheet = score_submission(&req.answers, &pool);

    let submission = store
        .create_submission(NewSubmission {
            token: req.token,
            student_id: claims.user_id()?,
            student_name: claims.username.clone(),
            answers: req.answers,
            questions: sheet.snapshot,
            score: sheet.score,
            total_marks: sheet.total_marks,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to store submission: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(
        "Student {} scored {}/{} on token {}",
        submission.student_name,
        submission.score,
        submission.total_marks,
        submission.token
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "score": submission.score,
            "total": submission.total_marks,
        })),
    ))
}

/// The current student's submissions, newest first.
pub async fn get_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = store.submissions_by_student(claims.user_id()?).await?;
    Ok(Json(submissions))
}
