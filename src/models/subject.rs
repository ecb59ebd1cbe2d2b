// src/models/subject.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::Question;

/// Represents the 'subjects' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
}

/// Subject row with the number of questions available for it.
#[derive(Debug, FromRow)]
pub struct SubjectWithCount {
    #[sqlx(flatten)]
    pub subject: Subject,
    pub question_count: i64,
}

/// Catalog entry shown when picking a subject to practise.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    #[serde(flatten)]
    pub subject: Subject,
    pub question_count: i64,
    pub difficulty: &'static str,
    /// Minutes.
    pub estimated_time: i64,
}

impl From<SubjectWithCount> for SubjectSummary {
    fn from(row: SubjectWithCount) -> Self {
        Self {
            estimated_time: estimated_minutes(row.question_count),
            subject: row.subject,
            question_count: row.question_count,
            difficulty: "medium",
        }
    }
}

/// Two minutes per question, never less than twenty.
pub fn estimated_minutes(question_count: i64) -> i64 {
    (question_count * 2).max(20)
}

/// Payload for starting a test on one subject.
#[derive(Debug, Serialize)]
pub struct TestPaper {
    pub subject: Subject,
    pub questions: Vec<Question>,
}
