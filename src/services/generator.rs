// src/services/generator.rs

//! Boundary to the question-generation model.
//!
//! The model itself is external. `HttpGenerator` talks to a model-serving
//! endpoint; `ScriptGenerator` runs the legacy Python script with the content
//! passed as a plain argument (no shell is involved).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

use crate::config::{Config, GeneratorBackend};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("no question generator is configured")]
    NotConfigured,
    #[error("generator request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator process failed: {0}")]
    Process(String),
    #[error("generator timed out after {0:?}")]
    Timeout(Duration),
    #[error("generator returned malformed output: {0}")]
    Malformed(String),
    #[error("content is too large for the generator ({len} bytes, limit {max})")]
    ContentTooLarge { len: usize, max: usize },
}

/// Largest content the script backend accepts. Linux caps a single argv
/// entry at 128 KiB (`MAX_ARG_STRLEN`); stay under it.
pub const MAX_SCRIPT_CONTENT_BYTES: usize = 120 * 1024;

/// What the generator is asked for.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub content: String,
    pub num_mcqs: u32,
    pub num_descriptive: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedMcq {
    pub question: String,
    pub options: Vec<String>,
    pub correct: String,
    #[serde(default)]
    pub correct_index: Option<i32>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl GeneratedMcq {
    /// Index of the correct option, falling back to its position in `options`.
    pub fn resolved_correct_index(&self) -> i32 {
        self.correct_index
            .or_else(|| {
                self.options
                    .iter()
                    .position(|opt| opt == &self.correct)
                    .map(|i| i as i32)
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedDescriptive {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeneratedQuestions {
    #[serde(default)]
    pub mcqs: Vec<GeneratedMcq>,
    #[serde(default)]
    pub descriptive: Vec<GeneratedDescriptive>,
}

impl GeneratedQuestions {
    pub fn is_empty(&self) -> bool {
        self.mcqs.is_empty() && self.descriptive.is_empty()
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuestions, GeneratorError>;
}

pub type DynGenerator = Arc<dyn QuestionGenerator>;

/// Builds the generator selected by configuration.
pub fn from_config(config: &Config) -> Result<DynGenerator, GeneratorError> {
    let timeout = Duration::from_secs(config.generator_timeout_secs);
    let generator: DynGenerator = match &config.generator {
        GeneratorBackend::Http { url } => Arc::new(HttpGenerator::new(url.clone(), timeout)?),
        GeneratorBackend::Script { python, script } => {
            Arc::new(ScriptGenerator::new(python.clone(), script.clone(), timeout))
        }
        GeneratorBackend::Disabled => {
            tracing::warn!("No question generator configured; uploads will fail");
            Arc::new(DisabledGenerator)
        }
    };
    Ok(generator)
}

/// POSTs the request as JSON and expects `GeneratedQuestions` back.
pub struct HttpGenerator {
    client: Client,
    url: String,
}

impl HttpGenerator {
    pub fn new(url: String, timeout: Duration) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl QuestionGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuestions, GeneratorError> {
        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let questions: GeneratedQuestions = response.json().await?;
        tracing::info!(
            mcqs = questions.mcqs.len(),
            descriptive = questions.descriptive.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generator responded"
        );
        Ok(questions)
    }
}

/// Runs `python <script> --text <content> --pdf_content <content> ...` and parses stdout.
pub struct ScriptGenerator {
    python: String,
    script: String,
    timeout: Duration,
}

impl ScriptGenerator {
    pub fn new(python: String, script: String, timeout: Duration) -> Self {
        Self { python, script, timeout }
    }
}

#[async_trait]
impl QuestionGenerator for ScriptGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuestions, GeneratorError> {
        if request.content.len() > MAX_SCRIPT_CONTENT_BYTES {
            return Err(GeneratorError::ContentTooLarge {
                len: request.content.len(),
                max: MAX_SCRIPT_CONTENT_BYTES,
            });
        }

        let output = Command::new(&self.python)
            .arg(&self.script)
            .arg("--text")
            .arg(&request.content)
            .arg("--pdf_content")
            .arg(&request.content)
            .arg("--num_mcqs")
            .arg(request.num_mcqs.to_string())
            .arg("--num_descriptive")
            .arg(request.num_descriptive.to_string())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| GeneratorError::Timeout(self.timeout))?
            .map_err(|e| GeneratorError::Process(format!("could not start {}: {}", self.python, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::Process(format!(
                "exit status {}: {}",
                output.status,
                last_line(&stderr).or_else(|| last_line(&stdout)).unwrap_or("no output")
            )));
        }

        parse_script_output(&stdout)
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

/// The script prints progress lines before its JSON result; take the last JSON line.
pub fn parse_script_output(stdout: &str) -> Result<GeneratedQuestions, GeneratorError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| GeneratorError::Malformed("no JSON object in output".to_string()))?;

    serde_json::from_str(line).map_err(|e| GeneratorError::Malformed(e.to_string()))
}

pub struct DisabledGenerator;

#[async_trait]
impl QuestionGenerator for DisabledGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedQuestions, GeneratorError> {
        Err(GeneratorError::NotConfigured)
    }
}
