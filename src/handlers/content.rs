// src/handlers/content.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::{MAX_QUESTIONS_PER_KIND, MAX_TEXT_WORDS},
    error::AppError,
    models::{
        note::NewNote,
        question::{NewQuestion, QuestionType},
    },
    services::{
        generator::{GeneratedQuestions, GenerationRequest, GeneratorError},
        pdf::PdfError,
    },
    state::AppState,
    utils::{html::clean_text, jwt::Claims},
};

const DEFAULT_NUM_MCQS: u32 = 5;
const DEFAULT_NUM_DESCRIPTIVE: u32 = 3;
const DEFAULT_MCQ_MARKS: f64 = 2.0;
const DEFAULT_DESCRIPTIVE_MARKS: f64 = 10.0;

/// Raw multipart fields of an upload.
#[derive(Default)]
struct UploadForm {
    input_type: Option<String>,
    subject: Option<String>,
    text_content: Option<String>,
    pdf: Option<(Option<String>, Bytes)>,
    num_mcqs: Option<String>,
    num_descriptive: Option<String>,
    mcq_marks: Option<String>,
    descriptive_marks: Option<String>,
}

/// Validated generation parameters.
#[derive(Debug, PartialEq)]
struct GenerationParams {
    num_mcqs: u32,
    num_descriptive: u32,
    mcq_marks: f64,
    descriptive_marks: f64,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "pdf" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.pdf = Some((file_name, bytes));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let slot = match name.as_str() {
            "inputType" => &mut form.input_type,
            "subject" => &mut form.subject,
            "textContent" => &mut form.text_content,
            "numMCQs" => &mut form.num_mcqs,
            "numDescriptive" => &mut form.num_descriptive,
            "mcqMarks" => &mut form.mcq_marks,
            "descriptiveMarks" => &mut form.descriptive_marks,
            other => {
                tracing::debug!("Ignoring unknown upload field '{}'", other);
                continue;
            }
        };
        *slot = Some(value);
    }

    Ok(form)
}

fn parse_count(raw: Option<&str>, default: u32) -> Result<u32, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<i64>()
            .map(|n| n.clamp(1, MAX_QUESTIONS_PER_KIND as i64) as u32)
            .map_err(|_| AppError::BadRequest("Invalid numeric parameters".to_string())),
    }
}

fn parse_marks(raw: Option<&str>, default: f64) -> Result<f64, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<f64>()
            .ok()
            .filter(|m| m.is_finite() && *m > 0.0)
            .ok_or_else(|| AppError::BadRequest("Invalid numeric parameters".to_string())),
    }
}

fn parse_params(form: &UploadForm) -> Result<GenerationParams, AppError> {
    Ok(GenerationParams {
        num_mcqs: parse_count(form.num_mcqs.as_deref(), DEFAULT_NUM_MCQS)?,
        num_descriptive: parse_count(form.num_descriptive.as_deref(), DEFAULT_NUM_DESCRIPTIVE)?,
        mcq_marks: parse_marks(form.mcq_marks.as_deref(), DEFAULT_MCQ_MARKS)?,
        descriptive_marks: parse_marks(form.descriptive_marks.as_deref(), DEFAULT_DESCRIPTIVE_MARKS)?,
    })
}

/// Staging failures are ours; anything pdftotext rejects is the upload's fault.
fn pdf_error(err: PdfError) -> AppError {
    tracing::error!("Failed to extract PDF content: {}", err);
    match err {
        PdfError::Io(e) => AppError::InternalServerError(format!("Failed to stage PDF: {}", e)),
        other => AppError::BadRequest(format!("Failed to process PDF: {}", other)),
    }
}

fn generation_error(err: GeneratorError) -> AppError {
    match err {
        GeneratorError::ContentTooLarge { .. } => AppError::BadRequest(err.to_string()),
        other => AppError::GenerationFailed(format!("Question generation failed: {}", other)),
    }
}

/// Strips markup from everything the generator produced before it is stored or echoed.
fn sanitize(mut generated: GeneratedQuestions) -> GeneratedQuestions {
    for mcq in &mut generated.mcqs {
        mcq.question = clean_text(&mcq.question);
        mcq.correct = clean_text(&mcq.correct);
        mcq.options = mcq.options.iter().map(|o| clean_text(o)).collect();
        mcq.context = mcq.context.as_deref().map(clean_text);
    }
    for desc in &mut generated.descriptive {
        desc.question = clean_text(&desc.question);
        desc.answer = clean_text(&desc.answer);
        desc.context = desc.context.as_deref().map(clean_text);
    }
    generated
}

fn to_new_questions(
    generated: &GeneratedQuestions,
    token: &str,
    subject: &str,
    params: &GenerationParams,
    pdf_content: Option<&str>,
) -> Vec<NewQuestion> {
    let mcqs = generated.mcqs.iter().map(|mcq| NewQuestion {
        token: token.to_string(),
        question_type: QuestionType::Mcq,
        question: mcq.question.clone(),
        options: mcq.options.clone(),
        correct_answer: mcq.correct.clone(),
        correct_index: mcq.resolved_correct_index(),
        marks: params.mcq_marks,
        context: mcq.context.clone(),
        difficulty: mcq.difficulty.clone(),
        subject: subject.to_string(),
        pdf_content: None,
    });

    let descriptive = generated.descriptive.iter().map(|desc| NewQuestion {
        token: token.to_string(),
        question_type: QuestionType::Descriptive,
        question: desc.question.clone(),
        options: Vec::new(),
        correct_answer: desc.answer.clone(),
        correct_index: 0,
        marks: params.descriptive_marks,
        context: desc.context.clone(),
        difficulty: desc.difficulty.clone(),
        subject: subject.to_string(),
        pdf_content: pdf_content.map(str::to_string),
    });

    mcqs.chain(descriptive).collect()
}

/// Accepts text or a PDF, generates a question pool and stores it under a new token.
pub async fn upload_content(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let form = read_form(multipart?).await?;

    let input_type = form.input_type.as_deref().unwrap_or_default();
    if input_type != "text" && input_type != "pdf" {
        return Err(AppError::BadRequest(
            "Invalid input type. Must be 'text' or 'pdf'".to_string(),
        ));
    }

    let subject = form
        .subject
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "General".to_string());

    let (content, file_name) = if input_type == "pdf" {
        let Some((file_name, bytes)) = &form.pdf else {
            return Err(AppError::BadRequest("No PDF file provided".to_string()));
        };
        if bytes.len() > state.config.max_upload_bytes {
            return Err(AppError::BadRequest("PDF exceeds the upload size limit".to_string()));
        }
        tracing::info!("Processing PDF file: {:?}", file_name);
        let text = state.pdf.extract_text(bytes).await.map_err(pdf_error)?;
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("No readable text found in the PDF".to_string()));
        }
        (text, file_name.clone())
    } else {
        let text = form.text_content.clone().unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("No text content provided".to_string()));
        }
        if text.split_whitespace().count() > MAX_TEXT_WORDS {
            return Err(AppError::BadRequest(format!(
                "Text exceeds {} words limit",
                MAX_TEXT_WORDS
            )));
        }
        (text, None)
    };

    let params = parse_params(&form)?;
    tracing::info!(
        teacher = %claims.username,
        "Generating {} MCQs and {} descriptive questions from {} content",
        params.num_mcqs,
        params.num_descriptive,
        input_type
    );

    let request = GenerationRequest {
        content: content.clone(),
        num_mcqs: params.num_mcqs,
        num_descriptive: params.num_descriptive,
    };
    let generated = state
        .generator
        .generate(&request)
        .await
        .map_err(generation_error)?;

    if generated.mcqs.is_empty() {
        tracing::warn!("No MCQs were generated from the provided {} content", input_type);
    }
    if generated.descriptive.is_empty() {
        tracing::warn!("No descriptive questions were generated from the provided {} content", input_type);
    }
    if generated.is_empty() {
        return Err(AppError::GenerationFailed(
            "Failed to generate any questions".to_string(),
        ));
    }

    let generated = sanitize(generated);
    let token = uuid::Uuid::new_v4().to_string();
    let pdf_content = (input_type == "pdf").then_some(content.as_str());
    let questions = to_new_questions(&generated, &token, &subject, &params, pdf_content);

    let note = NewNote {
        token: token.clone(),
        content,
        input_type: input_type.to_string(),
        subject,
        file_name,
    };

    let saved = state.store.create_pool(note, questions).await.map_err(|e| {
        tracing::error!("Database insertion failed: {:?}", e);
        AppError::from(e)
    })?;
    tracing::info!("Inserted {} questions under token {}", saved.len(), token);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "mcqs": generated.mcqs,
            "descriptiveQuestions": generated.descriptive,
        })),
    ))
}
