// src/handlers/tutor.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    services::{evaluator, prompts, tutor::SharedProvider},
};

const DEFAULT_SUBJECT: &str = "General questions";
const TUTOR_UNAVAILABLE: &str =
    "Sorry, the AI tutor could not answer right now. Please try again later.";

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AskTutorRequest {
    #[validate(length(min = 1, max = 2000, message = "Question cannot be empty."))]
    pub question: String,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
}

/// Free-form question to the AI tutor.
pub async fn ask(
    State(config): State<Config>,
    State(tutor): State<SharedProvider>,
    payload: Result<Json<AskTutorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;
    if req.question.trim().is_empty() {
        return Err(AppError::BadRequest("Question cannot be empty.".to_string()));
    }

    let subject = req
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBJECT);

    let prompt = prompts::ask_tutor(subject, &req.question);
    let answer = match evaluator::best_effort(tutor.as_ref(), prompt, config.llm.timeout).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Tutor request failed: {}", e);
            TUTOR_UNAVAILABLE.to_string()
        }
    };

    Ok(Json(serde_json::json!({ "answer": answer })))
}
