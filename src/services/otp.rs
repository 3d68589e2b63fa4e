// src/services/otp.rs

//! Pending sign-ups awaiting email verification.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::Rng;
use tokio::sync::Mutex;

use crate::models::user::Role;

/// Wrong guesses allowed before a pending registration is discarded.
pub const MAX_OTP_ATTEMPTS: u32 = 5;

/// A registration held until its OTP is confirmed. The password is already hashed.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    otp: String,
    expires_at: Instant,
    failed_attempts: u32,
}

/// In-process OTP table keyed by lowercase username.
#[derive(Clone)]
pub struct OtpStore {
    pending: Arc<Mutex<HashMap<String, PendingRegistration>>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Stores a pending registration and returns its freshly generated OTP.
    /// A second registration for the same username replaces the first.
    pub async fn issue(&self, username: &str, email: &str, password_hash: String, role: Role) -> String {
        let otp = rand::thread_rng().gen_range(100_000..=999_999).to_string();
        let now = Instant::now();

        let mut pending = self.pending.lock().await;
        pending.retain(|_, entry| entry.expires_at > now);
        pending.insert(
            username.to_lowercase(),
            PendingRegistration {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role,
                otp: otp.clone(),
                expires_at: now + self.ttl,
                failed_attempts: 0,
            },
        );
        otp
    }

    /// Consumes the pending registration if `otp` matches and has not expired.
    /// After `MAX_OTP_ATTEMPTS` misses the registration is dropped and must be restarted.
    pub async fn verify(&self, username: &str, otp: &str) -> Option<PendingRegistration> {
        let key = username.to_lowercase();
        let mut pending = self.pending.lock().await;

        let entry = pending.get_mut(&key)?;
        if entry.expires_at <= Instant::now() {
            pending.remove(&key);
            return None;
        }
        if entry.otp != otp.trim() {
            entry.failed_attempts += 1;
            if entry.failed_attempts >= MAX_OTP_ATTEMPTS {
                tracing::warn!("Too many wrong OTPs for {}; registration discarded", entry.username);
                pending.remove(&key);
            }
            return None;
        }
        pending.remove(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn otp_is_six_digits_and_single_use() {
        let store = OtpStore::new(Duration::from_secs(600));
        let otp = store.issue("Alice", "a@example.com", "hash".into(), Role::Student).await;
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));

        assert!(store.verify("alice", "000000x").await.is_none());
        let pending = store.verify("alice", &otp).await.unwrap();
        assert_eq!(pending.username, "Alice");
        assert_eq!(pending.email, "a@example.com");
        assert!(store.verify("alice", &otp).await.is_none());
    }

    #[tokio::test]
    async fn repeated_wrong_guesses_discard_the_registration() {
        let store = OtpStore::new(Duration::from_secs(600));
        let otp = store.issue("dave", "d@example.com", "hash".into(), Role::Student).await;

        for _ in 0..MAX_OTP_ATTEMPTS {
            assert!(store.verify("dave", "not-it").await.is_none());
        }
        assert!(store.verify("dave", &otp).await.is_none());
    }

    #[tokio::test]
    async fn a_few_wrong_guesses_still_allow_the_right_code() {
        let store = OtpStore::new(Duration::from_secs(600));
        let otp = store.issue("erin", "e@example.com", "hash".into(), Role::Student).await;

        for _ in 0..MAX_OTP_ATTEMPTS - 1 {
            assert!(store.verify("erin", "not-it").await.is_none());
        }
        assert!(store.verify("erin", &otp).await.is_some());
    }

    #[tokio::test]
    async fn expired_otp_is_rejected() {
        let store = OtpStore::new(Duration::ZERO);
        let otp = store.issue("bob", "b@example.com", "hash".into(), Role::Teacher).await;
        assert!(store.verify("bob", &otp).await.is_none());
    }

    #[tokio::test]
    async fn reissue_replaces_previous_code() {
        let store = OtpStore::new(Duration::from_secs(600));
        let first = store.issue("carol", "c@example.com", "h1".into(), Role::Student).await;
        let second = store.issue("carol", "c@example.com", "h2".into(), Role::Student).await;
        if first != second {
            assert!(store.verify("carol", &first).await.is_none());
        }
        assert_eq!(store.verify("carol", &second).await.unwrap().password_hash, "h2");
    }
}
