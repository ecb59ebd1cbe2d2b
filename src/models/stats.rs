// src/models/stats.rs

use serde::Serialize;

use crate::models::badge::EarnedBadge;

/// Accuracy and activity for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject_id: i64,
    pub subject_name: String,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub accuracy: i32,
    pub last_test_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Dashboard aggregate for the current user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub user_id: i64,
    pub total_tests: usize,
    pub correct_answers: usize,
    pub total_answers: usize,
    pub average_score: i32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub subject_progress: Vec<SubjectProgress>,
    pub recent_badges: Vec<EarnedBadge>,
    pub current_xp: i64,
    pub current_level: i32,
}
