// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    db::DynStore,
    error::AppError,
    models::submission::{LeaderboardEntry, LeaderboardResponse, Submission},
    services::scoring::class_average,
};

/// Ranks submissions that are already sorted by score, 1-based.
fn rank(submissions: Vec<Submission>) -> Vec<LeaderboardEntry> {
    submissions
        .into_iter()
        .enumerate()
        .map(|(i, s)| LeaderboardEntry {
            id: s.id,
            rank: i + 1,
            student_name: s.student_name,
            score: s.score,
            total_marks: s.total_marks,
            submitted_at: s.submitted_at,
        })
        .collect()
}

/// Ranked submissions for a token, the class average and the pool size.
pub async fn get_leaderboard(
    State(store): State<DynStore>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = store.submissions_by_token(&token).await.map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::from(e)
    })?;
    let total_questions = store.count_questions(&token).await?;
    let class_average = class_average(submissions.iter().map(|s| s.score));

    Ok(Json(LeaderboardResponse {
        leaderboard: rank(submissions),
        class_average,
        total_questions,
    }))
}
