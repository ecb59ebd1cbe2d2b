// src/services/stats.rs
//
// Read-side aggregation over a user's answer history. Nothing is materialised;
// every view recomputes from the rows.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::FromRow;

use crate::{
    models::{badge::Badge, stats::SubjectProgress},
    services::scoring::percentage,
};

/// One stored answer, reduced to what the aggregates need.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerActivity {
    pub subject_id: i64,
    pub subject_name: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Everything the stats and achievements views derive from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySummary {
    pub total_answers: usize,
    pub correct_answers: usize,
    pub accuracy: i32,
    pub tests_completed: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub subject_progress: Vec<SubjectProgress>,
}

pub fn summarize(history: &[AnswerActivity], today: NaiveDate) -> ActivitySummary {
    let correct_answers = history.iter().filter(|a| a.is_correct).count();
    let dates = active_dates(history);
    ActivitySummary {
        total_answers: history.len(),
        correct_answers,
        accuracy: percentage(correct_answers, history.len()),
        tests_completed: count_tests(history),
        current_streak: current_streak(&dates, today),
        longest_streak: longest_streak(&dates),
        subject_progress: subject_progress(history),
    }
}

/// A test is every distinct (calendar date, subject) pair.
pub fn count_tests(history: &[AnswerActivity]) -> usize {
    history
        .iter()
        .map(|a| (a.answered_at.date_naive(), a.subject_id))
        .collect::<HashSet<_>>()
        .len()
}

pub fn active_dates(history: &[AnswerActivity]) -> BTreeSet<NaiveDate> {
    history.iter().map(|a| a.answered_at.date_naive()).collect()
}

/// Consecutive active days ending today, or yesterday when today has no activity yet.
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut day = if dates.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while dates.contains(&day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// Longest run of day-adjacent dates.
pub fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates.iter().rev() {
        run = match previous {
            Some(prev) if prev.signed_duration_since(date).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }
    longest
}

/// Per-subject totals, ordered by subject name.
pub fn subject_progress(history: &[AnswerActivity]) -> Vec<SubjectProgress> {
    let mut by_subject: BTreeMap<&str, SubjectProgress> = BTreeMap::new();
    for answer in history {
        let entry = by_subject
            .entry(answer.subject_name.as_str())
            .or_insert_with(|| SubjectProgress {
                subject_id: answer.subject_id,
                subject_name: answer.subject_name.clone(),
                total_questions: 0,
                correct_answers: 0,
                accuracy: 0,
                last_test_date: None,
            });
        entry.total_questions += 1;
        if answer.is_correct {
            entry.correct_answers += 1;
        }
        if entry.last_test_date.is_none_or(|last| answer.answered_at > last) {
            entry.last_test_date = Some(answer.answered_at);
        }
    }

    by_subject
        .into_values()
        .map(|mut p| {
            p.accuracy = percentage(p.correct_answers, p.total_questions);
            p
        })
        .collect()
}

/// Accuracy percentage keyed by subject name.
pub fn subject_mastery(progress: &[SubjectProgress]) -> BTreeMap<String, i32> {
    progress
        .iter()
        .map(|p| (p.subject_name.clone(), p.accuracy))
        .collect()
}

/// 0..=100 progress toward `badge`.
pub fn badge_progress(badge: &Badge, is_earned: bool, xp: i64, current_streak: u32) -> i32 {
    if is_earned {
        return 100;
    }
    if let Some(days) = badge.required_streak_days.filter(|d| *d > 0) {
        return percentage(current_streak as usize, days as usize).min(100);
    }
    if badge.xp_required > 0 {
        return percentage(xp.max(0) as usize, badge.xp_required as usize).min(100);
    }
    0
}
