use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::instrument;

use super::dto::{
    success, CodeResponse, ConfirmResetRequest, ConfirmVerificationRequest, EmailRequest,
    LoginRequest, RegisterRequest, RoleResponse, TokenResponse, UpdatePasswordRequest,
};
use super::extractors::AdminUser;
use crate::error::AuthError;
use crate::state::AppState;

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    state
        .service
        .register(&payload.email, &payload.password, payload.role.as_deref())
        .await?;
    Ok(success(Some(
        json!({ "message": "successfully created user" }),
    )))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn request_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    let code = state.service.request_account_code(&payload.email).await?;
    Ok(success(Some(json!(CodeResponse {
        verification_code: code
    }))))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn confirm_verification(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmVerificationRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    state
        .service
        .confirm_account(&payload.email, &payload.verification_code)
        .await?;
    Ok(success(None))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    let token = state
        .service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(success(Some(json!(TokenResponse { token }))))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    let code = state.service.request_password_reset(&payload.email).await?;
    Ok(success(Some(json!(CodeResponse {
        verification_code: code
    }))))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmResetRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    state
        .service
        .confirm_password_reset(
            &payload.email,
            &payload.verification_code,
            &payload.new_password,
        )
        .await?;
    Ok(success(None))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn update_password(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    state
        .service
        .update_password(
            &payload.email,
            &payload.old_password,
            &payload.new_password,
        )
        .await?;
    Ok(success(None))
}

/// Admin-only. Deleting an absent account is not a failure; the response
/// just says so.
#[instrument(skip(state, admin, payload), fields(email = %payload.email, admin = %admin.subject))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    let existed = state.service.delete_account(&payload.email).await?;
    if existed {
        Ok(success(None))
    } else {
        Ok(success(Some(json!({ "message": "user not found" }))))
    }
}

/// Admin-only role lookup. The role field is informational; access rights
/// come from the token tier, not from here.
#[instrument(skip(state, admin, payload), fields(email = %payload.email, admin = %admin.subject))]
pub async fn get_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<Value>, AuthError> {
    payload.validate()?;
    let role = state.service.get_role(&payload.email).await?;
    Ok(success(Some(json!(RoleResponse { role }))))
}

pub async fn healthz() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}
