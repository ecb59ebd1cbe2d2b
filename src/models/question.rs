// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub subject_id: i64,

    pub question_text: String,

    /// Answer options in display order.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index into `options`.
    pub correct_option: i32,

    pub explanation: Option<String>,

    pub topic: Option<String>,

    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// Text of the option at `index`, if the index points at one.
    pub fn option_text(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }

    pub fn correct_answer(&self) -> &str {
        self.option_text(self.correct_option).unwrap_or_default()
    }
}

/// A question joined with the name of its subject.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionWithSubject {
    #[sqlx(flatten)]
    pub question: Question,
    pub subject_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateQuestionRequest {
    pub subject_id: i64,
    #[validate(length(min = 1, max = 1000, message = "Question text is required."))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3, message = "Correct option must be between 0 and 3."))]
    pub correct_option: i32,
    /// Generated by the tutor when omitted.
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Topic is required."))]
    pub topic: String,
    pub difficulty: Difficulty,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries")
            .with_message("There must be exactly 4 answer options.".into()));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank")
                .with_message("All answer options must be filled in.".into()));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
