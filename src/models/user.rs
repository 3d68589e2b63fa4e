// src/models/user.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Account role. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    #[default]
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username (case-insensitive).
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'teacher' or 'student'.
    pub role: String,

    pub email: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }
}

/// Insert payload for a user whose password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: String,
}

/// DTO for starting a registration. The account is created after OTP verification.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
}

/// DTO for the direct user setup route.
#[derive(Debug, Deserialize, Validate)]
pub struct SetupUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 4, max = 128))]
    pub password: String,
    #[serde(default = "default_setup_role")]
    pub role: Role,
    #[serde(default)]
    pub email: String,
}

fn default_setup_role() -> Role {
    Role::Teacher
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub username: String,
    pub otp: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Profile of the current user, with role-specific history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub role: String,
    pub conducted_tests: Vec<ConductedTest>,
    pub attended_tests: Vec<AttendedTest>,
}

/// A test a teacher created, as listed in their history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConductedTest {
    pub token: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "numMCQs")]
    pub num_mcqs: i32,
    pub num_descriptive: i32,
    pub subject: String,
}

/// A test a student sat, as listed in their history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendedTest {
    pub token: String,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub score: f64,
    pub total_marks: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!(Role::Student.to_string(), "student");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn register_request_defaults_to_student() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","password":"secret","email":"a@example.com"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Student);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_request_rejects_bad_email() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","password":"secret","email":"nope"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
