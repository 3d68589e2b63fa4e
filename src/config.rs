// src/config.rs

use std::env;

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_JWT_EXPIRATION: u64 = 24 * 60 * 60;
pub const DEFAULT_OTP_TTL: u64 = 10 * 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_GENERATOR_TIMEOUT: u64 = 120;

/// Longest text upload accepted, counted in whitespace separated words.
pub const MAX_TEXT_WORDS: usize = 3000;

/// Upper bound for the number of questions of one kind requested per upload.
pub const MAX_QUESTIONS_PER_KIND: u32 = 50;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Where generated questions come from.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorBackend {
    /// JSON over HTTP to a model-serving endpoint.
    Http { url: String },
    /// Legacy mode: run the Python generator script per request.
    Script { python: String, script: String },
    /// No generator configured; uploads fail with a generation error.
    Disabled,
}

/// SMTP relay used to mail registration OTPs.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    /// `None` uses the relay's default submission port.
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub generator: GeneratorBackend,
    pub generator_timeout_secs: u64,
    pub pdftotext_bin: String,
    pub max_upload_bytes: usize,
    pub otp_ttl_secs: u64,
    pub enable_setup_user: bool,
    pub seed_teacher_username: Option<String>,
    pub seed_teacher_password: Option<String>,
    /// `None` falls back to logging OTPs instead of mailing them.
    pub smtp: Option<SmtpConfig>,
    /// Development only: print OTP codes in the log when no SMTP relay is set.
    pub log_otp: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let generator = match (get("GENERATOR_URL"), get("GENERATOR_SCRIPT")) {
            (Some(url), _) => {
                Url::parse(&url).map_err(|_| ConfigError::Invalid {
                    name: "GENERATOR_URL",
                    value: url.clone(),
                })?;
                GeneratorBackend::Http { url }
            }
            (None, Some(script)) => GeneratorBackend::Script {
                python: get("GENERATOR_PYTHON").unwrap_or_else(|| "python".to_string()),
                script,
            },
            (None, None) => GeneratorBackend::Disabled,
        };

        let smtp = match (get("EMAIL_USER"), get("EMAIL_PASS")) {
            (Some(username), Some(password)) => Some(SmtpConfig {
                host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port: get("SMTP_PORT")
                    .map(|raw| parse_or("SMTP_PORT", Some(raw), 0u16))
                    .transpose()?,
                from: get("EMAIL_FROM").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url: get("DATABASE_URL"),
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION_SECONDS", get("JWT_EXPIRATION_SECONDS"), DEFAULT_JWT_EXPIRATION)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            cors_origins,
            generator,
            generator_timeout_secs: parse_or(
                "GENERATOR_TIMEOUT_SECONDS",
                get("GENERATOR_TIMEOUT_SECONDS"),
                DEFAULT_GENERATOR_TIMEOUT,
            )?,
            pdftotext_bin: get("PDFTOTEXT_BIN").unwrap_or_else(|| "pdftotext".to_string()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES)?,
            otp_ttl_secs: parse_or("OTP_TTL_SECONDS", get("OTP_TTL_SECONDS"), DEFAULT_OTP_TTL)?,
            enable_setup_user: parse_or("ENABLE_SETUP_USER", get("ENABLE_SETUP_USER"), false)?,
            seed_teacher_username: get("SEED_TEACHER_USERNAME"),
            seed_teacher_password: get("SEED_TEACHER_PASSWORD"),
            smtp,
            log_otp: parse_or("LOG_OTP", get("LOG_OTP"), false)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.jwt_expiration, DEFAULT_JWT_EXPIRATION);
        assert_eq!(config.otp_ttl_secs, 600);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.generator, GeneratorBackend::Disabled);
        assert!(config.database_url.is_none());
        assert!(!config.enable_setup_user);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn http_generator_wins_over_script() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("GENERATOR_URL", "http://localhost:8000/generate"),
            ("GENERATOR_SCRIPT", "ai-service/app.py"),
        ]))
        .unwrap();
        assert_eq!(
            config.generator,
            GeneratorBackend::Http { url: "http://localhost:8000/generate".to_string() }
        );
    }

    #[test]
    fn script_generator_defaults_to_python() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("GENERATOR_SCRIPT", "ai-service/app.py"),
        ]))
        .unwrap();
        assert_eq!(
            config.generator,
            GeneratorBackend::Script {
                python: "python".to_string(),
                script: "ai-service/app.py".to_string(),
            }
        );
    }

    #[test]
    fn smtp_needs_both_credentials() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("EMAIL_USER", "qm@example.com")])).unwrap();
        assert!(config.smtp.is_none());
        assert!(!config.log_otp);

        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("EMAIL_USER", "qm@example.com"),
            ("EMAIL_PASS", "app-password"),
            ("SMTP_PORT", "587"),
        ]))
        .unwrap();
        assert_eq!(
            config.smtp,
            Some(SmtpConfig {
                host: "smtp.gmail.com".to_string(),
                port: Some(587),
                username: "qm@example.com".to_string(),
                password: "app-password".to_string(),
                from: "qm@example.com".to_string(),
            })
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("PORT", "eighty")])),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("GENERATOR_URL", "not a url")])),
            Err(ConfigError::Invalid { name: "GENERATOR_URL", .. })
        ));
    }
}
