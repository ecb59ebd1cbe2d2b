// src/services/prompts.rs
//
// Prompt templates sent to the chat-completion provider.

use crate::services::tutor::{ChatMessage, Prompt};

/// Everything the templates know about one answered question.
#[derive(Debug, Clone)]
pub struct AnswerContext {
    pub subject: String,
    pub topic: String,
    pub question: String,
    pub correct_answer: String,
    pub user_answer: String,
}

const REMEDIAL_SYSTEM: &str = "You are an experienced, caring exam-preparation tutor. \
A student has just answered a question incorrectly. Give a detailed, encouraging explanation.

Structure your answer:
1. Error analysis: explain why the student may have picked this option.
2. Correct solution: walk through the right reasoning step by step.
3. Knowledge gaps: name the specific topics to study.
4. Practical tips: concrete advice for improving.
5. Motivation: encourage the student to keep going.

Speak as a mentor: friendly and clear, with examples and analogies.";

const REINFORCEMENT_SYSTEM: &str = "You are an experienced exam-preparation tutor. \
The student answered correctly. Praise them and add useful information on the topic.

Structure your answer:
1. Praise for the correct answer.
2. The reasoning behind the solution.
3. Additional facts about the topic.
4. Links to related topics.
5. Motivation to keep studying.";

/// Prompt for a wrong answer: diagnose the misconception, show the reasoning, point at topics.
pub fn remedial(ctx: &AnswerContext) -> Prompt {
    Prompt {
        messages: vec![
            ChatMessage::system(REMEDIAL_SYSTEM),
            ChatMessage::user(format!(
                "Subject: {}\nTopic: {}\nQuestion: {}\nCorrect answer: {}\nStudent's answer: {}\n\n\
                 Give a detailed explanation following the structure above. \
                 Be specific about which topics to study.",
                ctx.subject, ctx.topic, ctx.question, ctx.correct_answer, ctx.user_answer
            )),
        ],
        max_tokens: 800,
    }
}

/// Prompt for a correct answer: affirm and add context.
pub fn reinforcement(ctx: &AnswerContext) -> Prompt {
    Prompt {
        messages: vec![
            ChatMessage::system(REINFORCEMENT_SYSTEM),
            ChatMessage::user(format!(
                "Subject: {}\nTopic: {}\nQuestion: {}\nCorrect answer: {}\n\n\
                 The student answered correctly! Give a positive explanation with extra information.",
                ctx.subject, ctx.topic, ctx.question, ctx.correct_answer
            )),
        ],
        max_tokens: 600,
    }
}

/// Short explanation stored with a newly created question.
pub fn question_explanation(
    subject: &str,
    topic: &str,
    question: &str,
    options: &[String],
    correct_answer: &str,
) -> Prompt {
    let listed = options
        .iter()
        .enumerate()
        .map(|(i, opt)| format!("{}) {}", option_letter(i), opt))
        .collect::<Vec<_>>()
        .join(", ");

    Prompt {
        messages: vec![
            ChatMessage::system(format!(
                "You are an experienced teacher of \"{subject}\". Write a short but clear \
                 explanation of the correct answer to an exam question. It should teach the topic."
            )),
            ChatMessage::user(format!(
                "Subject: {subject}\nTopic: {topic}\nQuestion: {question}\nOptions: {listed}\n\
                 Correct answer: {correct_answer}\n\n\
                 Explain in 2-3 sentences why this answer is correct."
            )),
        ],
        max_tokens: 200,
    }
}

/// Free-form question to the tutor.
pub fn ask_tutor(subject: &str, question: &str) -> Prompt {
    Prompt {
        messages: vec![
            ChatMessage::system(format!(
                "You are an AI tutor for \"{subject}\" helping students prepare for exams. \
                 Answer thoroughly, with examples, formulas where needed and practical advice. \
                 Be friendly and motivating."
            )),
            ChatMessage::user(question),
        ],
        max_tokens: 800,
    }
}

fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tutor::Role;

    fn ctx() -> AnswerContext {
        AnswerContext {
            subject: "Physics".into(),
            topic: "Mechanics".into(),
            question: "Newton's first law is also called the law of:".into(),
            correct_answer: "Inertia".into(),
            user_answer: "Gravitation".into(),
        }
    }

    #[test]
    fn remedial_prompt_mentions_both_answers() {
        let prompt = remedial(&ctx());
        assert_eq!(prompt.messages[0].role, Role::System);
        let user = &prompt.messages[1].content;
        assert!(user.contains("Correct answer: Inertia"));
        assert!(user.contains("Student's answer: Gravitation"));
    }

    #[test]
    fn reinforcement_prompt_omits_user_answer() {
        let prompt = reinforcement(&ctx());
        assert!(!prompt.messages[1].content.contains("Gravitation"));
        assert!(prompt.max_tokens < remedial(&ctx()).max_tokens);
    }

    #[test]
    fn question_explanation_letters_options() {
        let options: Vec<String> = ["10", "12", "14", "16"].iter().map(|s| s.to_string()).collect();
        let prompt = question_explanation("Math", "Arithmetic", "√144?", &options, "12");
        assert!(prompt.messages[1].content.contains("A) 10, B) 12, C) 14, D) 16"));
    }
}
