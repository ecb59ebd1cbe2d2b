// src/services/evaluator.rs

use std::time::Duration;

use serde::Serialize;

use crate::{
    models::question::Question,
    services::{
        prompts::{self, AnswerContext},
        tutor::{ExplanationProvider, Prompt, TutorError},
    },
};

/// Selection recorded when the question timer runs out.
pub const UNANSWERED: i32 = -1;

/// Shown as the user's answer when nothing was selected.
pub const NOT_ANSWERED_LABEL: &str = "Not answered";

/// Whether `selected` is the correct option of `question`.
///
/// Anything outside the option range, the `UNANSWERED` sentinel included, is wrong.
pub fn evaluate(question: &Question, selected: i32) -> bool {
    is_correct(question.correct_option, question.options.len(), selected)
}

pub fn is_correct(correct_option: i32, option_count: usize, selected: i32) -> bool {
    match usize::try_from(selected) {
        Ok(index) => index < option_count && selected == correct_option,
        Err(_) => false,
    }
}

/// Deterministic text used whenever the provider cannot deliver.
pub fn fallback_explanation(correct_answer: &str, topic: &str) -> String {
    format!("Correct answer: {correct_answer}. Review topic: {topic}.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub text: String,
    pub source: ExplanationSource,
}

impl Explanation {
    fn fallback(text: String) -> Self {
        Self {
            text,
            source: ExplanationSource::Fallback,
        }
    }
}

/// Runs one provider call bounded by `timeout`. No retries.
pub async fn best_effort(
    provider: &dyn ExplanationProvider,
    prompt: Prompt,
    timeout: Duration,
) -> Result<String, TutorError> {
    match tokio::time::timeout(timeout, provider.complete(prompt)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
        Ok(Ok(_)) => Err(TutorError::EmptyCompletion),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(TutorError::Timeout(timeout)),
    }
}

/// Builds the context the prompt templates need for an answered question.
pub fn answer_context(question: &Question, subject_name: &str, selected: i32) -> AnswerContext {
    AnswerContext {
        subject: subject_name.to_string(),
        topic: question
            .topic
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| subject_name.to_string()),
        question: question.question_text.clone(),
        correct_answer: question.correct_answer().to_string(),
        user_answer: question
            .option_text(selected)
            .unwrap_or(NOT_ANSWERED_LABEL)
            .to_string(),
    }
}

/// Remedial prose for a wrong answer, reinforcement for a right one.
/// Never fails: provider errors and timeouts degrade to `fallback_explanation`.
pub async fn explain_answer(
    provider: &dyn ExplanationProvider,
    ctx: &AnswerContext,
    is_correct: bool,
    timeout: Duration,
) -> Explanation {
    let prompt = if is_correct {
        prompts::reinforcement(ctx)
    } else {
        prompts::remedial(ctx)
    };

    match best_effort(provider, prompt, timeout).await {
        Ok(text) => Explanation {
            text,
            source: ExplanationSource::Ai,
        },
        Err(e) => {
            tracing::warn!("Explanation provider failed, using fallback: {}", e);
            Explanation::fallback(fallback_explanation(&ctx.correct_answer, &ctx.topic))
        }
    }
}
