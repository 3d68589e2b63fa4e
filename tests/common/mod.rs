// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qmaster::{
    config::{Config, GeneratorBackend},
    db::{DynStore, MemoryStore, Store},
    models::user::{NewUser, Role},
    routes,
    services::{
        generator::{
            GeneratedDescriptive, GeneratedMcq, GeneratedQuestions, GenerationRequest,
            GeneratorError, QuestionGenerator,
        },
        mailer::{MailError, Mailer},
    },
    state::AppState,
    utils::hash::hash_password,
};

pub const PASSWORD: &str = "password123";

/// Records every OTP instead of sending it.
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    pub fn last_otp(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, otp)| otp.clone())
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push((to.to_string(), otp.to_string()));
        Ok(())
    }
}

/// Returns a fixed pool: three valid MCQs, one prompt echo, two valid descriptive questions.
pub struct StubGenerator {
    pub fail: bool,
}

fn mcq(question: &str, correct: &str, others: [&str; 3]) -> GeneratedMcq {
    let mut options = vec![correct.to_string()];
    options.extend(others.iter().map(|o| o.to_string()));
    GeneratedMcq {
        question: question.to_string(),
        options,
        correct: correct.to_string(),
        correct_index: Some(0),
        context: Some("source sentence".to_string()),
        difficulty: Some("easy".to_string()),
    }
}

pub fn stub_questions() -> GeneratedQuestions {
    GeneratedQuestions {
        mcqs: vec![
            mcq("What is the chemical symbol for water?", "H2O", ["CO2", "NaCl", "O3x"]),
            mcq("Which planet is known as the red planet?", "Mars", ["Venus", "Earth", "Jupiter"]),
            mcq("What gas do plants absorb from the air?", "Carbon dioxide", ["Oxygen", "Nitrogen", "Helium"]),
            mcq("Generate a clear MCQ based on: water?", "H2O", ["CO2", "NaCl", "O3x"]),
        ],
        descriptive: vec![
            GeneratedDescriptive {
                question: "Explain how photosynthesis produces glucose?".to_string(),
                answer: "Plants use light energy to turn carbon dioxide and water into glucose".to_string(),
                context: None,
                difficulty: Some("medium".to_string()),
            },
            GeneratedDescriptive {
                question: "Describe the stages of the water cycle?".to_string(),
                answer: "Evaporation condensation precipitation and collection".to_string(),
                context: None,
                difficulty: Some("medium".to_string()),
            },
        ],
    }
}

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuestions, GeneratorError> {
        if self.fail {
            return Err(GeneratorError::Process("model crashed".to_string()));
        }
        assert!(!request.content.is_empty());
        Ok(stub_questions())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        generator: GeneratorBackend::Disabled,
        generator_timeout_secs: 5,
        pdftotext_bin: "pdftotext".to_string(),
        max_upload_bytes: 1024 * 1024,
        otp_ttl_secs: 600,
        enable_setup_user: false,
        seed_teacher_username: None,
        seed_teacher_password: None,
        smtp: None,
        log_otp: false,
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: DynStore,
    pub mailer: Arc<CapturingMailer>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), false).await
}

/// Spawns the app on a random port against a fresh in-memory store.
pub async fn spawn_app_with(config: Config, failing_generator: bool) -> TestApp {
    let store: DynStore = Arc::new(MemoryStore::new());
    let mailer = Arc::new(CapturingMailer::default());
    let generator = Arc::new(StubGenerator { fail: failing_generator });

    let state = AppState::new(store.clone(), config, generator, mailer.clone());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
        mailer,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    /// Creates an account directly in the store and logs in, returning the bearer token.
    pub async fn user_token(&self, username: &str, role: Role) -> String {
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role,
                email: format!("{}@example.com", username),
            })
            .await
            .expect("Failed to create user");
        self.login(username).await
    }

    pub async fn login(&self, username: &str) -> String {
        let body: serde_json::Value = self
            .client
            .post(self.url("/login"))
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Uploads a short text as `teacher_token` and returns the pool token.
    pub async fn upload_text(&self, teacher_token: &str) -> String {
        let form = reqwest::multipart::Form::new()
            .text("inputType", "text")
            .text("subject", "Science")
            .text("textContent", "Water is H2O. Mars is red. Plants absorb carbon dioxide.")
            .text("numMCQs", "4")
            .text("numDescriptive", "2");

        let response = self
            .client
            .post(self.url("/upload-content"))
            .bearer_auth(teacher_token)
            .multipart(form)
            .send()
            .await
            .expect("Upload failed");
        assert_eq!(response.status().as_u16(), 201);

        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().expect("Pool token not found").to_string()
    }

    pub async fn create_test(&self, teacher_token: &str, token: &str, mcqs: i64, descriptive: i64) -> reqwest::Response {
        self.client
            .post(self.url("/teacher/create-test"))
            .bearer_auth(teacher_token)
            .json(&serde_json::json!({
                "token": token,
                "desiredMCQs": mcqs,
                "desiredDescriptive": descriptive
            }))
            .send()
            .await
            .expect("Create test failed")
    }
}
