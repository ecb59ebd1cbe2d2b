// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::subject::{QUESTION_COLUMNS, find_subject},
    models::question::{CreateQuestionRequest, Question},
    services::{
        evaluator::{self, fallback_explanation},
        prompts,
        tutor::SharedProvider,
    },
    utils::html::clean_html,
};

/// Creates a question. When no explanation is given the tutor writes one.
pub async fn create_question(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(tutor): State<SharedProvider>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let subject = find_subject(&pool, payload.subject_id).await?;
    let correct_answer = payload
        .options
        .get(payload.correct_option as usize)
        .cloned()
        .unwrap_or_default();

    let explanation = match payload
        .explanation
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        Some(given) => given.to_string(),
        None => {
            let prompt = prompts::question_explanation(
                &subject.name,
                &payload.topic,
                &payload.question_text,
                &payload.options,
                &correct_answer,
            );
            evaluator::best_effort(tutor.as_ref(), prompt, config.llm.timeout)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Failed to generate question explanation: {}", e);
                    fallback_explanation(&correct_answer, &payload.topic)
                })
        }
    };

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions
        (subject_id, question_text, options, correct_option, explanation, topic, difficulty)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(subject.id)
    .bind(payload.question_text.trim())
    .bind(SqlJson(&payload.options))
    .bind(payload.correct_option)
    .bind(clean_html(&explanation))
    .bind(payload.topic.trim())
    .bind(payload.difficulty.as_str())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(question_id = question.id, subject_id = subject.id, "Question created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Question created",
            "question": question,
        })),
    ))
}

/// Deletes a question together with the answers given to it.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
