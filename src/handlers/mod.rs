// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod profile;
pub mod subject;
pub mod test;
pub mod tutor;
