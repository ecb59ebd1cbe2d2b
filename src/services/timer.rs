// src/services/timer.rs
//
// Countdowns for a running quiz session: one per question, one for the whole
// attempt. Both are tokio tasks that report expiry over a channel and are
// aborted as soon as the session leaves `InProgress` or the driver is dropped.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::Instant,
};

use crate::{
    config::QUESTION_TIME_LIMIT_SECS,
    models::{answer::SubmittedAnswer, question::Question},
    services::{
        evaluator::UNANSWERED,
        session::{QuizSession, SessionError, SessionState},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The countdown for the question at `index` ran out.
    QuestionExpired { index: usize },
    /// The whole-session budget ran out.
    SessionExpired,
}

/// Where the session stands after moving on from a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Next(usize),
    Finished,
}

pub struct SessionTimers {
    tx: mpsc::UnboundedSender<TimerEvent>,
    question: Option<JoinHandle<()>>,
    session: Option<JoinHandle<()>>,
    question_budget: Duration,
}

impl SessionTimers {
    pub fn new(question_budget: Duration) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timers = Self {
            tx,
            question: None,
            session: None,
            question_budget,
        };
        (timers, rx)
    }

    pub fn question_budget(&self) -> Duration {
        self.question_budget
    }

    pub fn start_session(&mut self, budget: Duration) {
        if let Some(handle) = self.session.take() {
            handle.abort();
        }
        self.session = Some(self.countdown(budget, TimerEvent::SessionExpired));
    }

    /// Restarts the per-question countdown for `index`.
    pub fn restart_question(&mut self, index: usize) {
        self.stop_question();
        self.question = Some(self.countdown(
            self.question_budget,
            TimerEvent::QuestionExpired { index },
        ));
    }

    pub fn stop_question(&mut self) {
        if let Some(handle) = self.question.take() {
            handle.abort();
        }
    }

    pub fn cancel(&mut self) {
        self.stop_question();
        if let Some(handle) = self.session.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.question.is_some() || self.session.is_some()
    }

    fn countdown(&self, after: Duration, event: TimerEvent) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The receiver is gone once the driver is dropped.
            let _ = tx.send(event);
        })
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owns a session together with its countdowns.
///
/// Must be created inside a tokio runtime.
pub struct SessionDriver {
    session: QuizSession,
    timers: SessionTimers,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    question_started: Instant,
}

impl SessionDriver {
    pub fn start(
        subject_id: i64,
        subject_name: impl Into<String>,
        questions: Vec<Question>,
        time_limit_secs: u64,
    ) -> Result<Self, SessionError> {
        Self::with_question_budget(
            subject_id,
            subject_name,
            questions,
            time_limit_secs,
            Duration::from_secs(QUESTION_TIME_LIMIT_SECS),
        )
    }

    pub fn with_question_budget(
        subject_id: i64,
        subject_name: impl Into<String>,
        questions: Vec<Question>,
        time_limit_secs: u64,
        question_budget: Duration,
    ) -> Result<Self, SessionError> {
        let mut session = QuizSession::new();
        session.start(subject_id, subject_name, questions, time_limit_secs)?;

        let (mut timers, events) = SessionTimers::new(question_budget);
        timers.start_session(session.time_limit());
        timers.restart_question(0);

        Ok(Self {
            session,
            timers,
            events,
            question_started: Instant::now(),
        })
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn timers_running(&self) -> bool {
        self.timers.is_running()
    }

    /// Answers the current question, timing it from when it was shown.
    /// The question countdown stops once an answer is in.
    pub fn answer(&mut self, selected_option: i32) -> Result<SubmittedAnswer, SessionError> {
        let question_id = self
            .session
            .current_question()
            .map(|q| q.id)
            .ok_or(SessionError::NotInProgress)?;
        if self.session.has_answered(question_id) {
            return Err(SessionError::AlreadyAnswered(question_id));
        }

        let elapsed = self.question_started.elapsed().as_secs();
        let time_spent = i32::try_from(elapsed).unwrap_or(i32::MAX);
        let answer = self
            .session
            .submit_answer(question_id, selected_option, time_spent)?
            .clone();
        self.timers.stop_question();
        Ok(answer)
    }

    /// Moves on: next question (countdown reset) or, after the last, completion.
    pub fn advance(&mut self) -> Result<Progress, SessionError> {
        if !self.session.is_active() {
            return Err(SessionError::NotInProgress);
        }
        if self.session.is_last_question() {
            self.complete();
            return Ok(Progress::Finished);
        }

        let index = self.session.advance()?;
        self.timers.restart_question(index);
        self.question_started = Instant::now();
        Ok(Progress::Next(index))
    }

    /// Completes the session and cancels both countdowns.
    pub fn complete(&mut self) {
        // Only fails for a session that never started, which a driver cannot hold.
        let _ = self.session.complete();
        self.timers.cancel();
    }

    /// Waits for the next countdown to run out and applies it.
    ///
    /// Returns `None` once the session is no longer in progress.
    pub async fn next_expiry(&mut self) -> Option<TimerEvent> {
        while self.session.is_active() {
            let event = self.events.recv().await?;
            if self.apply(event) {
                return Some(event);
            }
        }
        None
    }

    /// Returns false for expiries that no longer concern the session.
    fn apply(&mut self, event: TimerEvent) -> bool {
        if self.session.state() != SessionState::InProgress {
            return false;
        }

        match event {
            TimerEvent::SessionExpired => {
                tracing::debug!("Session time limit reached, completing");
                self.complete();
                true
            }
            TimerEvent::QuestionExpired { index } => {
                if index != self.session.current_index() {
                    return false;
                }
                let Some(question_id) = self.session.current_question().map(|q| q.id) else {
                    return false;
                };
                if !self.session.has_answered(question_id) {
                    let budget = i32::try_from(self.timers.question_budget().as_secs())
                        .unwrap_or(i32::MAX);
                    if let Err(e) = self.session.submit_answer(question_id, UNANSWERED, budget) {
                        tracing::warn!("Failed to record timed-out answer: {}", e);
                    }
                }
                if let Err(e) = self.advance() {
                    tracing::warn!("Failed to move past timed-out question: {}", e);
                }
                true
            }
        }
    }

    pub fn into_session(mut self) -> QuizSession {
        self.timers.cancel();
        std::mem::take(&mut self.session)
    }
}
