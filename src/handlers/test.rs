// src/handlers/test.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::subject::find_subject,
    models::{
        answer::{
            AnswerFeedback, AnswerRequest, ExplanationRequest, SubmitTestRequest,
            SubmitTestResponse, SubmittedAnswer,
        },
        badge::Badge,
        question::QuestionWithSubject,
    },
    services::{
        evaluator::{self, fallback_explanation},
        prompts::{self, AnswerContext},
        scoring::{self, ScoreCard, XpUpdate},
        tutor::SharedProvider,
    },
    utils::jwt::Claims,
};

/// Helper struct for fetching answer keys from the database.
#[derive(sqlx::FromRow)]
struct AnswerKey {
    id: i64,
    subject_id: i64,
    correct_option: i32,
    options: SqlJson<Vec<String>>,
}

/// Checks one answer and explains it.
///
/// The explanation never fails the request: provider errors and timeouts
/// are replaced by a templated fallback.
pub async fn answer_question(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(tutor): State<SharedProvider>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let row = sqlx::query_as::<_, QuestionWithSubject>(
        r#"
        SELECT
            q.id, q.subject_id, q.question_text, q.options, q.correct_option,
            q.explanation, q.topic, q.difficulty, q.created_at,
            s.name AS subject_name
        FROM questions q
        JOIN subjects s ON s.id = q.subject_id
        WHERE q.id = $1
        "#,
    )
    .bind(req.question_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch question {}: {:?}", req.question_id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let question = &row.question;
    let is_correct = evaluator::evaluate(question, req.selected_option);
    let ctx = evaluator::answer_context(question, &row.subject_name, req.selected_option);
    let explanation =
        evaluator::explain_answer(tutor.as_ref(), &ctx, is_correct, config.llm.timeout).await;

    tracing::debug!(
        question_id = question.id,
        is_correct,
        source = ?explanation.source,
        "Answer evaluated"
    );

    Ok(Json(AnswerFeedback {
        is_correct,
        correct_answer: ctx.correct_answer,
        user_answer: ctx.user_answer,
        explanation: explanation.text,
        topic: question.topic.clone(),
        subject: row.subject_name.clone(),
        time_spent: req.time_spent,
    }))
}

/// Remedial explanation for arbitrary question text.
pub async fn explain(
    State(config): State<Config>,
    State(tutor): State<SharedProvider>,
    payload: Result<Json<ExplanationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let ctx = AnswerContext {
        subject: req.subject.unwrap_or_else(|| req.topic.clone()),
        topic: req.topic,
        question: req.question,
        correct_answer: req.correct_answer,
        user_answer: req.user_answer,
    };

    let explanation = match evaluator::best_effort(
        tutor.as_ref(),
        prompts::remedial(&ctx),
        config.llm.timeout,
    )
    .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Explanation provider failed, using fallback: {}", e);
            fallback_explanation(&ctx.correct_answer, &ctx.topic)
        }
    };

    Ok(Json(serde_json::json!({ "explanation": explanation })))
}

/// Submits a completed test.
///
/// * Grades every answer against the stored key (the client's verdict is not trusted).
/// * Upserts answers per (user, question), last write wins.
/// * Adds 10 xp per correct answer, recomputes the level, awards reached badges.
/// * All of it in one transaction.
pub async fn submit_test(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubmitTestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;
    let user_id = claims.user_id()?;

    find_subject(&pool, req.subject_id).await?;

    let answers = scoring::dedupe_last_wins(req.answers);
    let keys = fetch_answer_keys(&pool, &answers).await?;
    let graded = grade(req.subject_id, answers, &keys)?;

    let (card, update, new_badges) = record_test(&pool, user_id, &graded).await?;

    tracing::info!(
        user_id,
        subject_id = req.subject_id,
        correct = card.correct,
        total = card.total,
        xp_earned = card.xp_earned,
        "Test submitted"
    );

    Ok(Json(SubmitTestResponse {
        message: "Test results saved".to_string(),
        xp_earned: card.xp_earned,
        new_level: update.level,
        total_xp: update.total_xp,
        correct_answers: card.correct,
        total_questions: card.total,
        accuracy: card.accuracy,
        new_badges,
    }))
}

async fn fetch_answer_keys(
    pool: &PgPool,
    answers: &[SubmittedAnswer],
) -> Result<HashMap<i64, AnswerKey>, AppError> {
    // Use QueryBuilder for dynamic IN clause
    let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
        "SELECT id, subject_id, correct_option, options FROM questions WHERE id IN (",
    );
    let mut separated = query_builder.separated(",");
    for answer in answers {
        separated.push_bind(answer.question_id);
    }
    separated.push_unseparated(")");

    let keys: Vec<AnswerKey> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch answer keys: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(keys.into_iter().map(|k| (k.id, k)).collect())
}

fn grade(
    subject_id: i64,
    answers: Vec<SubmittedAnswer>,
    keys: &HashMap<i64, AnswerKey>,
) -> Result<Vec<SubmittedAnswer>, AppError> {
    answers
        .into_iter()
        .map(|answer| {
            let key = keys.get(&answer.question_id).ok_or_else(|| {
                AppError::NotFound(format!("Question {} not found", answer.question_id))
            })?;
            if key.subject_id != subject_id {
                return Err(AppError::BadRequest(format!(
                    "Question {} does not belong to subject {}",
                    answer.question_id, subject_id
                )));
            }

            let is_correct =
                evaluator::is_correct(key.correct_option, key.options.len(), answer.selected_option);
            if is_correct != answer.is_correct {
                tracing::debug!(
                    question_id = answer.question_id,
                    "Client verdict differs from answer key"
                );
            }
            Ok(SubmittedAnswer {
                is_correct,
                ..answer
            })
        })
        .collect()
}

/// Persists a graded test atomically. Returns the score, the user's new xp/level
/// and the badges awarded by this call.
async fn record_test(
    pool: &PgPool,
    user_id: i64,
    answers: &[SubmittedAnswer],
) -> Result<(ScoreCard, XpUpdate, Vec<Badge>), AppError> {
    let mut tx = pool.begin().await?;

    // Row lock serialises concurrent submissions for the same user.
    let current_xp: i64 = sqlx::query_scalar("SELECT xp FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    for answer in answers {
        sqlx::query(
            r#"
            INSERT INTO user_answers (user_id, question_id, selected_option, is_correct, time_spent)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, question_id) DO UPDATE SET
                selected_option = EXCLUDED.selected_option,
                is_correct = EXCLUDED.is_correct,
                time_spent = EXCLUDED.time_spent,
                answered_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(answer.question_id)
        .bind(answer.selected_option)
        .bind(answer.is_correct)
        .bind(answer.time_spent)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert answer: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    let card = ScoreCard::tally(answers);
    let update = scoring::apply_xp(current_xp, card.xp_earned);

    sqlx::query("UPDATE users SET xp = $1, level = $2 WHERE id = $3")
        .bind(update.total_xp)
        .bind(update.level)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let badges = sqlx::query_as::<_, Badge>(
        r#"
        SELECT id, name, description, icon, color, category, xp_required, required_streak_days
        FROM badges
        ORDER BY xp_required, id
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    let earned: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT badge_id FROM user_badges WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

    let awarded: Vec<Badge> = scoring::badges_to_award(&badges, &earned, update.total_xp)
        .into_iter()
        .cloned()
        .collect();

    for badge in &awarded {
        sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, badge_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(badge.id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((card, update, awarded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, subject_id: i64, correct_option: i32) -> (i64, AnswerKey) {
        (
            id,
            AnswerKey {
                id,
                subject_id,
                correct_option,
                options: SqlJson(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
            },
        )
    }

    fn answer(question_id: i64, selected_option: i32, is_correct: bool) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            selected_option,
            is_correct,
            time_spent: 5,
        }
    }

    #[test]
    fn grade_overrides_client_verdict() {
        let keys: HashMap<_, _> = [key(1, 7, 0), key(2, 7, 1)].into_iter().collect();
        let graded = grade(7, vec![answer(1, 0, false), answer(2, 3, true)], &keys).unwrap();
        assert!(graded[0].is_correct);
        assert!(!graded[1].is_correct);
    }

    #[test]
    fn grade_rejects_unknown_and_foreign_questions() {
        let keys: HashMap<_, _> = [key(1, 7, 0), key(2, 8, 1)].into_iter().collect();
        assert!(matches!(
            grade(7, vec![answer(3, 0, true)], &keys),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            grade(7, vec![answer(2, 1, true)], &keys),
            Err(AppError::BadRequest(_))
        ));
    }
}
