// src/models/mod.rs

pub mod note;
pub mod question;
pub mod submission;
pub mod test_config;
pub mod user;
