// src/services/session.rs
//
// Quiz attempt state machine. A session is an owned value held by whoever
// drives the attempt; nothing here is global or persisted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{
    models::{
        answer::{SubmitTestRequest, SubmittedAnswer},
        question::Question,
    },
    services::{evaluator, scoring::percentage},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a session needs at least one question")]
    NoQuestions,
    #[error("session has already been started")]
    AlreadyStarted,
    #[error("session is not in progress")]
    NotInProgress,
    #[error("session has not been completed")]
    NotCompleted,
    #[error("question {0} is not part of this session")]
    UnknownQuestion(i64),
    #[error("question {0} has already been answered")]
    AlreadyAnswered(i64),
    #[error("already at the last question, complete the session instead")]
    AtLastQuestion,
}

/// Results shown once a session is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub subject_id: i64,
    pub subject_name: String,
    pub total_questions: usize,
    pub answered: usize,
    pub correct_answers: usize,
    pub accuracy: i32,
    /// Sum of per-answer time, seconds.
    pub total_time: i64,
}

#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    subject_id: i64,
    subject_name: String,
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<SubmittedAnswer>,
    started_at: Option<DateTime<Utc>>,
    time_limit: Duration,
    state: SessionState,
}

impl QuizSession {
    /// A session in `NotStarted`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to `InProgress` at question 0.
    ///
    /// An empty question list is rejected; callers substitute a fallback set.
    pub fn start(
        &mut self,
        subject_id: i64,
        subject_name: impl Into<String>,
        questions: Vec<Question>,
        time_limit_secs: u64,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let subject_name = subject_name.into();
        tracing::debug!(
            subject_id,
            subject = %subject_name,
            questions = questions.len(),
            time_limit_secs,
            "Starting quiz session"
        );

        *self = Self {
            subject_id,
            subject_name,
            questions,
            current_index: 0,
            answers: Vec::new(),
            started_at: Some(Utc::now()),
            time_limit: Duration::from_secs(time_limit_secs),
            state: SessionState::InProgress,
        };
        Ok(())
    }

    /// Grades `selected_option` against the snapshot and records the answer.
    pub fn submit_answer(
        &mut self,
        question_id: i64,
        selected_option: i32,
        time_spent_secs: i32,
    ) -> Result<&SubmittedAnswer, SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::NotInProgress);
        }
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;

        let is_correct = evaluator::evaluate(question, selected_option);
        self.answers.push(SubmittedAnswer {
            question_id,
            selected_option,
            is_correct,
            time_spent: time_spent_secs.max(0),
        });
        Ok(&self.answers[self.answers.len() - 1])
    }

    /// Moves to the next question. At the last one the caller must `complete()`.
    pub fn advance(&mut self) -> Result<usize, SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::NotInProgress);
        }
        if self.is_last_question() {
            return Err(SessionError::AtLastQuestion);
        }
        self.current_index += 1;
        Ok(self.current_index)
    }

    /// Terminal. Completing twice is harmless.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::NotStarted => Err(SessionError::NotInProgress),
            SessionState::InProgress => {
                self.state = SessionState::Completed;
                Ok(())
            }
            SessionState::Completed => Ok(()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::InProgress
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[SubmittedAnswer] {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn has_answered(&self, question_id: i64) -> bool {
        self.answers.iter().any(|a| a.question_id == question_id)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn summary(&self) -> SessionSummary {
        let correct_answers = self.answers.iter().filter(|a| a.is_correct).count();
        SessionSummary {
            subject_id: self.subject_id,
            subject_name: self.subject_name.clone(),
            total_questions: self.questions.len(),
            answered: self.answers.len(),
            correct_answers,
            accuracy: percentage(correct_answers, self.questions.len()),
            total_time: self.answers.iter().map(|a| i64::from(a.time_spent)).sum(),
        }
    }

    /// Body for the batch submission endpoint. Only available once completed.
    pub fn to_submission(&self) -> Result<SubmitTestRequest, SessionError> {
        if self.state != SessionState::Completed {
            return Err(SessionError::NotCompleted);
        }
        Ok(SubmitTestRequest {
            subject_id: self.subject_id,
            answers: self.answers.clone(),
        })
    }
}
