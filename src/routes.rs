// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, content, health, leaderboard, profile, student, teacher},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Multipart framing overhead allowed on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Every endpoint is served under `/api` and, for older clients, unprefixed.
/// * Teacher and student areas sit behind `auth_middleware` plus a role check.
/// * Applies global middleware (Trace, CORS) and injects the application state.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let public_routes = Router::new()
        .route("/setup-user", post(auth::setup_user))
        .route("/register", post(auth::register))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/health", get(health::health));

    let teacher_routes = Router::new()
        .route(
            "/upload-content",
            post(content::upload_content).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/teacher/questions/{token}", get(teacher::get_questions))
        .route(
            "/teacher/question-history/{token}",
            get(teacher::question_history),
        )
        .route("/teacher/create-test", post(teacher::create_test))
        .route("/teacher/results", get(teacher::get_all_results))
        .route("/teacher/results/{token}", get(teacher::get_results))
        .route("/teacher/history", get(profile::teacher_history))
        .layer(middleware::from_fn(teacher_middleware));

    let student_routes = Router::new()
        .route("/student/join", post(student::join_test))
        .route("/student/submit", post(student::submit_test))
        .route("/student/results", get(student::get_results))
        .route("/student/history", get(profile::student_history))
        .layer(middleware::from_fn(student_middleware));

    // Role checks run inside the auth layer, so claims are already present.
    let protected_routes = Router::new()
        .route("/profile", get(profile::get_profile))
        .route("/leaderboard/{token}", get(leaderboard::get_leaderboard))
        .merge(teacher_routes)
        .merge(student_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = public_routes.merge(protected_routes);

    Router::new()
        .nest("/api", api.clone())
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}
