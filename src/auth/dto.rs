use axum::Json;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AuthError, FieldErrors};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_email(fields: &mut FieldErrors, email: &str) {
    fields.require(email, "email");
    if !email.trim().is_empty() {
        fields.check(is_valid_email(email), "email", "valid email required");
    }
}

/// JSend success envelope; `data: None` serializes without a data key.
pub fn success(data: Option<Value>) -> Json<Value> {
    match data {
        Some(data) => Json(json!({ "status": "success", "data": data })),
        None => Json(json!({ "status": "success" })),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut fields = FieldErrors::default();
        check_email(&mut fields, &self.email);
        fields.require(&self.password, "password");
        fields.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

impl EmailRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut fields = FieldErrors::default();
        check_email(&mut fields, &self.email);
        fields.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmVerificationRequest {
    pub email: String,
    pub verification_code: String,
}

impl ConfirmVerificationRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut fields = FieldErrors::default();
        check_email(&mut fields, &self.email);
        fields.require(&self.verification_code, "verification_code");
        fields.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut fields = FieldErrors::default();
        check_email(&mut fields, &self.email);
        fields.require(&self.password, "password");
        fields.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmResetRequest {
    pub email: String,
    pub verification_code: String,
    pub new_password: String,
}

impl ConfirmResetRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut fields = FieldErrors::default();
        check_email(&mut fields, &self.email);
        fields.require(&self.verification_code, "verification_code");
        fields.require(&self.new_password, "new_password");
        fields.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub email: String,
    pub old_password: String,
    pub new_password: String,
}

impl UpdatePasswordRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut fields = FieldErrors::default();
        check_email(&mut fields, &self.email);
        fields.require(&self.old_password, "old_password");
        fields.require(&self.new_password, "new_password");
        fields.finish()
    }
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub verification_code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn email_regex_rejects_garbage() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn register_request_aggregates_field_errors() {
        let req = RegisterRequest {
            email: "bad".into(),
            password: "".into(),
            role: None,
        };
        let err = req.validate().unwrap_err();
        match err {
            AuthError::Validation(_) => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_register_request_passes() {
        let req = RegisterRequest {
            email: "a@x.com".into(),
            password: "pw1".into(),
            role: Some("admin".into()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn success_envelope_shapes() {
        let body = success(None);
        assert_eq!(body.0["status"], "success");
        assert!(body.0.get("data").is_none());

        let body = success(Some(json!({ "token": "t" })));
        assert_eq!(body.0["data"]["token"], "t");
    }
}
