// src/handlers/profile.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    config::RECENT_BADGES_LIMIT,
    error::AppError,
    handlers::auth::USER_COLUMNS,
    models::{
        badge::{Achievement, AchievementUserStats, AchievementsResponse, Badge, EarnedBadge},
        stats::UserStatsResponse,
        user::User,
    },
    services::stats::{self, AnswerActivity},
    utils::jwt::Claims,
};

/// Get the current user's profile with xp and level.
pub async fn get_current_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user(&pool, claims.user_id()?).await?;
    Ok(Json(user))
}

/// Dashboard statistics derived from the user's answer history.
pub async fn get_user_stats(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user(&pool, claims.user_id()?).await?;
    let history = load_history(&pool, user.id).await?;
    let summary = stats::summarize(&history, Utc::now().date_naive());

    let recent_badges = sqlx::query_as::<_, EarnedBadge>(
        r#"
        SELECT b.id, b.name, b.icon, b.color, ub.earned_at
        FROM user_badges ub
        JOIN badges b ON b.id = ub.badge_id
        WHERE ub.user_id = $1
        ORDER BY ub.earned_at DESC, b.id DESC
        LIMIT $2
        "#,
    )
    .bind(user.id)
    .bind(RECENT_BADGES_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(UserStatsResponse {
        user_id: user.id,
        total_tests: summary.tests_completed,
        correct_answers: summary.correct_answers,
        total_answers: summary.total_answers,
        average_score: summary.accuracy,
        current_streak: summary.current_streak,
        longest_streak: summary.longest_streak,
        subject_progress: summary.subject_progress,
        recent_badges,
        current_xp: user.xp,
        current_level: user.level,
    }))
}

/// All badges with earned state and progress, plus the user's stats.
pub async fn get_achievements(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_user(&pool, claims.user_id()?).await?;

    let badges = sqlx::query_as::<_, Badge>(
        r#"
        SELECT id, name, description, icon, color, category, xp_required, required_streak_days
        FROM badges
        ORDER BY xp_required, id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let earned: HashMap<i64, DateTime<Utc>> = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        "SELECT badge_id, earned_at FROM user_badges WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .collect();

    let history = load_history(&pool, user.id).await?;
    let summary = stats::summarize(&history, Utc::now().date_naive());

    let achievements = badges
        .into_iter()
        .map(|badge| {
            let earned_at = earned.get(&badge.id).copied();
            let is_earned = earned_at.is_some();
            let progress =
                stats::badge_progress(&badge, is_earned, user.xp, summary.current_streak);
            Achievement {
                badge,
                is_earned,
                earned_at,
                progress,
            }
        })
        .collect();

    Ok(Json(AchievementsResponse {
        achievements,
        user_stats: AchievementUserStats {
            total_xp: user.xp,
            level: user.level,
            tests_completed: summary.tests_completed,
            correct_answers: summary.correct_answers,
            current_streak: summary.current_streak,
            longest_streak: summary.longest_streak,
            subject_mastery: stats::subject_mastery(&summary.subject_progress),
        },
    }))
}

async fn find_user(pool: &PgPool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

async fn load_history(pool: &PgPool, user_id: i64) -> Result<Vec<AnswerActivity>, AppError> {
    sqlx::query_as::<_, AnswerActivity>(
        r#"
        SELECT q.subject_id, s.name AS subject_name, a.is_correct, a.answered_at
        FROM user_answers a
        JOIN questions q ON q.id = a.question_id
        JOIN subjects s ON s.id = q.subject_id
        WHERE a.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answer history for user {}: {:?}", user_id, e);
        AppError::InternalServerError(e.to_string())
    })
}
