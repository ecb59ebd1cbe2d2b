// src/models/badge.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'badges' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    /// 'general', 'subject', 'streak', 'achievement' or 'special'.
    pub category: String,
    /// Awarded once the user's xp reaches this value.
    pub xp_required: i64,
    /// Set for streak badges; their progress is measured in consecutive active days.
    pub required_streak_days: Option<i32>,
}

/// A badge the user holds, as listed on the stats view.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub earned_at: chrono::DateTime<chrono::Utc>,
}

/// One badge on the achievements page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    #[serde(flatten)]
    pub badge: Badge,
    pub is_earned: bool,
    pub earned_at: Option<chrono::DateTime<chrono::Utc>>,
    /// 0..=100.
    pub progress: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUserStats {
    pub total_xp: i64,
    pub level: i32,
    pub tests_completed: usize,
    pub correct_answers: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Accuracy percentage keyed by subject name.
    pub subject_mastery: BTreeMap<String, i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsResponse {
    pub achievements: Vec<Achievement>,
    pub user_stats: AchievementUserStats,
}
