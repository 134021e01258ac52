use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};

use super::code::CodeGenerator;
use super::jwt::TokenIssuer;
use super::password::CredentialHasher;
use crate::domain::{User, UserStatus, Verification, VerificationPurpose};
use crate::error::AuthError;
use crate::repo::AuthRepo;

/// Owns the account state machine. All status transitions and all
/// verification-record bookkeeping go through here; handlers only decode
/// requests and map errors.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AuthRepo>,
    hasher: Arc<dyn CredentialHasher>,
    codes: Arc<dyn CodeGenerator>,
    tokens: Arc<dyn TokenIssuer>,
    code_ttl: Duration,
}

impl AccountService {
    pub fn new(
        repo: Arc<dyn AuthRepo>,
        hasher: Arc<dyn CredentialHasher>,
        codes: Arc<dyn CodeGenerator>,
        tokens: Arc<dyn TokenIssuer>,
        code_ttl_hours: i64,
    ) -> Self {
        Self {
            repo,
            hasher,
            codes,
            tokens,
            code_ttl: Duration::hours(code_ttl_hours),
        }
    }

    /// Creates an account in `pending_verification`. Any existing account
    /// for the email, whatever its status, makes this a conflict.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<(), AuthError> {
        let existing = self.repo.list_users(email).await?;
        if !existing.is_empty() {
            warn!(email, "registration for existing email");
            return Err(AuthError::UserExists);
        }

        let hash = self.hasher.hash(password).map_err(AuthError::Storage)?;
        let user = User::new(email.into(), hash, role.unwrap_or("user").into());
        self.repo.create_user(&user).await?;

        info!(user_id = %user.id, email, "user registered");
        Ok(())
    }

    /// Issues (or replaces) the account-verification code for an
    /// unverified user.
    pub async fn request_account_code(&self, email: &str) -> Result<String, AuthError> {
        let user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Once verified, this channel stays closed; a pending reset is
        // completed via the reset code, never via an account code.
        if user.status != UserStatus::PendingVerification {
            return Err(AuthError::AlreadyVerified);
        }

        self.issue_code(email, VerificationPurpose::Account).await
    }

    /// Consumes an account-verification code; on match the account becomes
    /// `active` and the record is removed.
    pub async fn confirm_account(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let mut user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.consume_code(email, VerificationPurpose::Account, code)
            .await?;

        user.status = UserStatus::Active;
        user.updated_at = OffsetDateTime::now_utc();
        self.repo.update_user(&user).await?;
        self.discard_verification(email).await;

        info!(user_id = %user.id, email, "account verified");
        Ok(())
    }

    /// Checks credentials and mints a user-tier bearer token. Unknown email
    /// and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.status != UserStatus::Active {
            warn!(email, "login attempt on unverified account");
            return Err(AuthError::NotVerified);
        }

        if !self.hasher.verify(&user.password_hash, password) {
            warn!(email, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(user.id)
            .map_err(AuthError::TokenGeneration)?;

        info!(user_id = %user.id, email, "user logged in");
        Ok(token)
    }

    /// Moves an active account into `pending_password_reset` and issues a
    /// reset code, replacing any prior one.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, AuthError> {
        let mut user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        match user.status {
            UserStatus::Active => {}
            UserStatus::PendingVerification => return Err(AuthError::NotVerified),
            UserStatus::PendingPasswordReset => return Err(AuthError::ResetAlreadyRequested),
        }

        // The record lands before the status flips so a failure here leaves
        // the account active and the request repeatable.
        let code = self
            .issue_code(email, VerificationPurpose::PasswordReset)
            .await?;

        user.status = UserStatus::PendingPasswordReset;
        user.updated_at = OffsetDateTime::now_utc();
        self.repo.update_user(&user).await?;

        info!(user_id = %user.id, email, "password reset requested");
        Ok(code)
    }

    /// Completes a password reset: live code, new hash, back to `active`.
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.status != UserStatus::PendingPasswordReset {
            return Err(AuthError::ResetNotRequested);
        }

        self.consume_code(email, VerificationPurpose::PasswordReset, code)
            .await?;

        user.password_hash = self.hasher.hash(new_password).map_err(AuthError::Storage)?;
        user.status = UserStatus::Active;
        user.updated_at = OffsetDateTime::now_utc();
        self.repo.update_user(&user).await?;
        self.discard_verification(email).await;

        info!(user_id = %user.id, email, "password reset completed");
        Ok(())
    }

    /// Rotates the password for an active, authenticated user. Leaves
    /// status and verification records untouched.
    pub async fn update_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.status != UserStatus::Active {
            return Err(AuthError::NotVerified);
        }

        if !self.hasher.verify(&user.password_hash, old_password) {
            warn!(email, "password update with wrong old password");
            return Err(AuthError::InvalidCredentials);
        }

        user.password_hash = self.hasher.hash(new_password).map_err(AuthError::Storage)?;
        user.updated_at = OffsetDateTime::now_utc();
        self.repo.update_user(&user).await?;

        info!(user_id = %user.id, email, "password updated");
        Ok(())
    }

    /// Deletes the account and its verification rows. Idempotent: returns
    /// whether a user row existed.
    pub async fn delete_account(&self, email: &str) -> Result<bool, AuthError> {
        let existed = self.repo.delete_user(email).await?;
        if existed {
            info!(email, "user deleted");
        }
        Ok(existed)
    }

    pub async fn get_role(&self, email: &str) -> Result<String, AuthError> {
        let user = self
            .repo
            .get_user(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user.role)
    }

    async fn issue_code(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<String, AuthError> {
        let code = self.codes.generate()?;
        let record = Verification::new(
            email.into(),
            purpose,
            code.clone(),
            OffsetDateTime::now_utc() + self.code_ttl,
            self.codes.max_retries(),
        );
        self.repo.upsert_verification(&record).await?;
        info!(email, purpose = purpose.as_str(), "verification code issued");
        Ok(code)
    }

    /// Single-use code check. A dead record (deadline passed or attempts
    /// exhausted) is deleted and reported as expired; a wrong guess burns
    /// one attempt and keeps the record.
    async fn consume_code(
        &self,
        email: &str,
        purpose: VerificationPurpose,
        presented: &str,
    ) -> Result<(), AuthError> {
        let mut record = self
            .repo
            .get_verification(email, purpose)
            .await?
            .ok_or(AuthError::VerificationNotFound)?;

        let now = OffsetDateTime::now_utc();
        if !record.is_live(now) {
            self.discard_verification(email).await;
            return Err(AuthError::CodeExpired);
        }

        if presented != record.code {
            record.attempts_remaining -= 1;
            record.updated_at = now;
            self.repo.upsert_verification(&record).await?;
            warn!(
                email,
                purpose = purpose.as_str(),
                attempts_remaining = record.attempts_remaining,
                "wrong verification code"
            );
            return Err(AuthError::CodeInvalid);
        }

        Ok(())
    }

    /// A leftover record after a successful transition is harmless (the
    /// next access treats it as stale), so a failed delete is only logged.
    async fn discard_verification(&self, email: &str) {
        if let Err(e) = self.repo.delete_verification(email).await {
            error!(error = %e, email, "unable to delete verification record");
        }
    }
}
