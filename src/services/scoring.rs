// src/services/scoring.rs

use std::collections::{HashMap, HashSet};

use crate::{
    config::{XP_PER_CORRECT_ANSWER, XP_PER_LEVEL},
    models::{answer::SubmittedAnswer, badge::Badge},
};

/// `floor(xp / 100) + 1`. Negative xp is treated as zero.
pub fn level_for_xp(xp: i64) -> i32 {
    let level = xp.max(0) / XP_PER_LEVEL + 1;
    i32::try_from(level).unwrap_or(i32::MAX)
}

/// `round(100 * part / total)` with halves rounded up, 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let part = part as u64;
    let total = total as u64;
    ((200 * part + total) / (2 * total)) as i32
}

/// Keeps one answer per question, the last one submitted, in first-seen order.
pub fn dedupe_last_wins(answers: Vec<SubmittedAnswer>) -> Vec<SubmittedAnswer> {
    let mut position: HashMap<i64, usize> = HashMap::new();
    let mut unique: Vec<SubmittedAnswer> = Vec::with_capacity(answers.len());
    for answer in answers {
        match position.get(&answer.question_id) {
            Some(&i) => unique[i] = answer,
            None => {
                position.insert(answer.question_id, unique.len());
                unique.push(answer);
            }
        }
    }
    unique
}

/// Outcome of grading one completed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCard {
    pub correct: usize,
    pub total: usize,
    pub xp_earned: i64,
    pub accuracy: i32,
}

impl ScoreCard {
    pub fn tally(answers: &[SubmittedAnswer]) -> Self {
        let correct = answers.iter().filter(|a| a.is_correct).count();
        Self {
            correct,
            total: answers.len(),
            xp_earned: correct as i64 * XP_PER_CORRECT_ANSWER,
            accuracy: percentage(correct, answers.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpUpdate {
    pub total_xp: i64,
    pub level: i32,
}

pub fn apply_xp(current_xp: i64, earned: i64) -> XpUpdate {
    let total_xp = current_xp.max(0) + earned.max(0);
    XpUpdate {
        total_xp,
        level: level_for_xp(total_xp),
    }
}

/// Badges whose xp threshold is met and that the user does not hold yet.
///
/// Running the sweep again with the same inputs plus its own output yields nothing.
pub fn badges_to_award<'a>(badges: &'a [Badge], earned: &HashSet<i64>, xp: i64) -> Vec<&'a Badge> {
    badges
        .iter()
        .filter(|b| b.xp_required <= xp && !earned.contains(&b.id))
        .collect()
}
