// src/services/mod.rs

pub mod generator;
pub mod mailer;
pub mod otp;
pub mod pdf;
pub mod scoring;
