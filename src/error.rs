use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Per-field validation failures, keyed by stable field names. All fields
/// are checked and reported in one response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn check(&mut self, ok: bool, key: &'static str, message: &str) {
        if !ok {
            self.0.entry(key).or_insert_with(|| message.to_string());
        }
    }

    pub fn require(&mut self, value: &str, key: &'static str) {
        self.check(!value.trim().is_empty(), key, "required");
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `Err(AuthError::Validation)` when any check failed.
    pub fn finish(self) -> Result<(), AuthError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("user already exists")]
    UserExists,
    #[error("user does not exist")]
    UserNotFound,
    #[error("no verification data found for user")]
    VerificationNotFound,
    #[error("verification code has expired")]
    CodeExpired,
    #[error("invalid verification code")]
    CodeInvalid,
    #[error("user already verified")]
    AlreadyVerified,
    #[error("user not verified")]
    NotVerified,
    #[error("password reset has not been requested")]
    ResetNotRequested,
    #[error("password reset already requested")]
    ResetAlreadyRequested,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("authorization failed")]
    Unauthenticated,
    #[error("token verification failed")]
    TokenInvalid,
    #[error("admin access rights required")]
    AdminRequired,
    #[error("auth token generation failed")]
    TokenGeneration(#[source] anyhow::Error),
    #[error("unable to generate verification code")]
    Entropy,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::UserExists
            | AuthError::AlreadyVerified
            | AuthError::ResetNotRequested
            | AuthError::ResetAlreadyRequested => StatusCode::CONFLICT,
            AuthError::UserNotFound | AuthError::VerificationNotFound => StatusCode::NOT_FOUND,
            AuthError::CodeExpired | AuthError::CodeInvalid => StatusCode::BAD_REQUEST,
            AuthError::NotVerified
            | AuthError::InvalidCredentials
            | AuthError::Unauthenticated
            | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
            AuthError::TokenGeneration(_) | AuthError::Entropy | AuthError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AuthError::Validation(fields) => json!({
                "status": "fail",
                "data": fields.0,
            }),
            // Internals are logged server-side; callers get a generic line.
            AuthError::Storage(e) => {
                error!(error = %e, "storage failure");
                json!({ "status": "error", "message": "internal server error" })
            }
            AuthError::TokenGeneration(e) => {
                error!(error = %e, "token generation failure");
                json!({ "status": "error", "message": self.to_string() })
            }
            other => json!({ "status": "error", "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
