use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{
    db::DynStore,
    error::AppError,
    models::user::{AttendedTest, ConductedTest, ProfileResponse, Role},
    utils::jwt::Claims,
};

async fn conducted_tests(store: &DynStore, teacher_id: i64) -> Result<Vec<ConductedTest>, AppError> {
    let tests = store.tests_by_teacher(teacher_id).await?;
    Ok(tests
        .into_iter()
        .map(|t| ConductedTest {
            token: t.token,
            created_at: t.created_at,
            num_mcqs: t.desired_mcqs,
            num_descriptive: t.desired_descriptive,
            subject: t.subject,
        })
        .collect())
}

async fn attended_tests(store: &DynStore, student_id: i64) -> Result<Vec<AttendedTest>, AppError> {
    let mut submissions = store.submissions_by_student(student_id).await?;
    // History reads oldest first, like an append-only log.
    submissions.reverse();
    Ok(submissions
        .into_iter()
        .map(|s| AttendedTest {
            token: s.token,
            submitted_at: s.submitted_at,
            score: s.score,
            total_marks: s.total_marks,
        })
        .collect())
}

/// Get current user's profile and role-specific history.
pub async fn get_profile(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let (conducted, attended) = match user.role() {
        Role::Teacher => (conducted_tests(&store, user.id).await?, Vec::new()),
        Role::Student => (Vec::new(), attended_tests(&store, user.id).await?),
    };

    let email = if user.email.is_empty() {
        "Not registered".to_string()
    } else {
        user.email
    };

    Ok(Json(ProfileResponse {
        username: user.username,
        email,
        role: user.role,
        conducted_tests: conducted,
        attended_tests: attended,
    }))
}

/// Tests the current teacher has created.
pub async fn teacher_history(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let conducted = conducted_tests(&store, claims.user_id()?).await?;
    Ok(Json(json!({ "conductedTests": conducted })))
}

/// Tests the current student has submitted.
pub async fn student_history(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attended = attended_tests(&store, claims.user_id()?).await?;
    Ok(Json(json!({ "attendedTests": attended })))
}
