// src/handlers/subject.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        question::Question,
        subject::{Subject, SubjectSummary, SubjectWithCount, TestPaper},
    },
};

pub(crate) const QUESTION_COLUMNS: &str = "id, subject_id, question_text, options, correct_option, \
     explanation, topic, difficulty, created_at";

/// Lists all subjects with how many questions each one has.
pub async fn list_subjects(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, SubjectWithCount>(
        r#"
        SELECT
            s.id, s.name, s.description, s.icon, s.color,
            COUNT(q.id) AS question_count
        FROM subjects s
        LEFT JOIN questions q ON q.subject_id = s.id
        GROUP BY s.id
        ORDER BY s.id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch subjects: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let subjects: Vec<SubjectSummary> = rows.into_iter().map(SubjectSummary::from).collect();
    Ok(Json(subjects))
}

/// Returns every question of a subject, answer key included.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_subject(&pool, subject_id).await?;
    let questions = fetch_questions(&pool, subject_id).await?;
    Ok(Json(questions))
}

/// Returns the subject together with its questions, for starting a test.
pub async fn get_test_paper(
    State(pool): State<PgPool>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = find_subject(&pool, subject_id).await?;
    let questions = fetch_questions(&pool, subject_id).await?;

    Ok(Json(TestPaper { subject, questions }))
}

pub(crate) async fn find_subject(pool: &PgPool, subject_id: i64) -> Result<Subject, AppError> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, name, description, icon, color FROM subjects WHERE id = $1",
    )
    .bind(subject_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Subject not found".to_string()))
}

async fn fetch_questions(pool: &PgPool, subject_id: i64) -> Result<Vec<Question>, AppError> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE subject_id = $1 ORDER BY id",
        QUESTION_COLUMNS
    ))
    .bind(subject_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions for subject {}: {:?}", subject_id, e);
        AppError::InternalServerError(e.to_string())
    })
}
