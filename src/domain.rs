use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account trust level. Transitions are owned by the account service:
/// `PendingVerification` -> `Active` -> `PendingPasswordReset` -> `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserStatus {
    PendingVerification,
    Active,
    PendingPasswordReset,
}

/// What an outstanding verification code proves control over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum VerificationPurpose {
    Account,
    PasswordReset,
}

impl VerificationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationPurpose::Account => "account",
            VerificationPurpose::PasswordReset => "password_reset",
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: UserStatus,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn new(email: String, password_hash: String, role: String) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            status: UserStatus::PendingVerification,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outstanding one-time code for an `(email, purpose)` pair. At most one
/// live record exists per pair; issuing a new code replaces the old one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Verification {
    pub email: String,
    pub purpose: VerificationPurpose,
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub attempts_remaining: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Verification {
    pub fn new(
        email: String,
        purpose: VerificationPurpose,
        code: String,
        expires_at: OffsetDateTime,
        attempts_remaining: i32,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            email,
            purpose,
            code,
            expires_at,
            attempts_remaining,
            created_at: now,
            updated_at: now,
        }
    }

    /// A record is usable only while attempts remain and the deadline has
    /// not passed. A dead record must be deleted on next access.
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.attempts_remaining > 0 && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn record(attempts: i32, expires_in: Duration) -> Verification {
        Verification::new(
            "a@x.com".into(),
            VerificationPurpose::Account,
            "ABCDEF".into(),
            OffsetDateTime::now_utc() + expires_in,
            attempts,
        )
    }

    #[test]
    fn live_record_has_attempts_and_time() {
        let now = OffsetDateTime::now_utc();
        assert!(record(3, Duration::hours(1)).is_live(now));
    }

    #[test]
    fn exhausted_record_is_dead() {
        let now = OffsetDateTime::now_utc();
        assert!(!record(0, Duration::hours(1)).is_live(now));
    }

    #[test]
    fn expired_record_is_dead() {
        let now = OffsetDateTime::now_utc();
        assert!(!record(3, Duration::hours(-1)).is_live(now));
    }
}
