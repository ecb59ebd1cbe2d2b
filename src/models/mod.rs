// src/models/mod.rs

pub mod answer;
pub mod badge;
pub mod question;
pub mod stats;
pub mod subject;
pub mod user;
