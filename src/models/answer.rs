// src/models/answer.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::badge::Badge;

/// DTO for checking a single answer while a test is running.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswerRequest {
    pub question_id: i64,
    /// `-1` means the question timer ran out.
    #[validate(range(min = -1, max = 3, message = "selectedOption must be -1 or an option index."))]
    pub selected_option: i32,
    #[validate(range(min = 0, message = "timeSpent cannot be negative."))]
    pub time_spent: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_answer: String,
    pub user_answer: String,
    pub explanation: String,
    pub topic: Option<String>,
    pub subject: String,
    pub time_spent: i32,
}

/// DTO for requesting an explanation outside of a stored question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExplanationRequest {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(max = 500))]
    pub user_answer: String,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
}

/// One answer of a completed test, as produced by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    #[validate(range(min = -1, max = 3, message = "selectedOption must be -1 or an option index."))]
    pub selected_option: i32,
    /// Client-side verdict. The server grades again against the stored key.
    pub is_correct: bool,
    #[validate(range(min = 0))]
    pub time_spent: i32,
}

/// DTO for submitting a completed test.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmitTestRequest {
    pub subject_id: i64,
    #[validate(length(min = 1, message = "No answers submitted"), nested)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestResponse {
    pub message: String,
    pub xp_earned: i64,
    pub new_level: i32,
    pub total_xp: i64,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub accuracy: i32,
    pub new_badges: Vec<Badge>,
}
