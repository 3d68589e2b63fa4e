// tests/api_tests.rs

mod common;

use common::{PASSWORD, spawn_app, spawn_app_with, test_config};
use qmaster::models::user::Role;
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/health")).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn routes_are_also_served_without_prefix() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn register_verify_login_flow() {
    // Arrange
    let app = spawn_app().await;

    // Act: start registration
    let response = app
        .client
        .post(app.url("/register"))
        .json(&json!({
            "username": "alice",
            "password": PASSWORD,
            "role": "student",
            "email": "alice@example.com"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "OTP sent to alice@example.com");

    // Login is rejected until the OTP is confirmed
    let response = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Act: verify the mailed OTP
    let otp = app.mailer.last_otp().expect("No OTP was mailed");
    let response = app
        .client
        .post(app.url("/verify-otp"))
        .json(&json!({ "username": "alice", "otp": otp }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // The OTP is single use
    let response = app
        .client
        .post(app.url("/verify-otp"))
        .json(&json!({ "username": "alice", "otp": otp }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Assert: login works and reports the role
    let response = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": "ALICE", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["role"], "student");
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let app = spawn_app().await;

    let cases = [
        json!({ "username": "ab", "password": PASSWORD, "email": "a@example.com" }),
        json!({ "username": "carol", "password": "123", "email": "c@example.com" }),
        json!({ "username": "carol", "password": PASSWORD, "email": "not-an-email" }),
    ];

    for case in cases {
        let response = app.client.post(app.url("/register")).json(&case).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 400, "payload {} should be rejected", case);
    }
    assert!(app.mailer.last_otp().is_none());
}

#[tokio::test]
async fn register_rejects_taken_username() {
    let app = spawn_app().await;
    app.user_token("dave", Role::Student).await;

    let response = app
        .client
        .post(app.url("/register"))
        .json(&json!({ "username": "Dave", "password": PASSWORD, "email": "d@example.com" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Username taken or invalid data");
}

#[tokio::test]
async fn verify_otp_rejects_wrong_code() {
    let app = spawn_app().await;
    app.client
        .post(app.url("/register"))
        .json(&json!({ "username": "erin", "password": PASSWORD, "email": "e@example.com" }))
        .send()
        .await
        .unwrap();
    let otp = app.mailer.last_otp().unwrap();
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    let response = app
        .client
        .post(app.url("/verify-otp"))
        .json(&json!({ "username": "erin", "otp": wrong }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired OTP");
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_user() {
    let app = spawn_app().await;
    app.user_token("frank", Role::Teacher).await;

    for (username, password) in [("frank", "wrong-password"), ("nobody", PASSWORD)] {
        let response = app
            .client
            .post(app.url("/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn setup_user_is_hidden_unless_enabled() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/setup-user"))
        .json(&json!({ "username": "grace", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn setup_user_creates_teacher_by_default() {
    let mut config = test_config();
    config.enable_setup_user = true;
    let app = spawn_app_with(config, false).await;

    let response = app
        .client
        .post(app.url("/setup-user"))
        .json(&json!({ "username": "grace", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = app
        .client
        .post(app.url("/setup-user"))
        .json(&json!({ "username": "grace", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let token = app.login("grace").await;
    let profile: Value = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["role"], "teacher");
    assert_eq!(profile["email"], "Not registered");
}

#[tokio::test]
async fn profile_requires_token() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/profile")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn profile_returns_user_details() {
    let app = spawn_app().await;
    let token = app.user_token("heidi", Role::Student).await;

    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "heidi");
    assert_eq!(body["email"], "heidi@example.com");
    assert_eq!(body["role"], "student");
    assert_eq!(body["attendedTests"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn roles_are_enforced() {
    let app = spawn_app().await;
    let student = app.user_token("ivan", Role::Student).await;
    let teacher = app.user_token("judy", Role::Teacher).await;

    let response = app
        .client
        .get(app.url("/teacher/history"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .client
        .get(app.url("/student/history"))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .client
        .get(app.url("/teacher/history"))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}
