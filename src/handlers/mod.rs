// src/handlers/mod.rs

pub mod auth;
pub mod content;
pub mod health;
pub mod leaderboard;
pub mod profile;
pub mod student;
pub mod teacher;
