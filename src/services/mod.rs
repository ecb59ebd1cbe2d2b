// src/services/mod.rs

pub mod evaluator;
pub mod prompts;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod timer;
pub mod tutor;
