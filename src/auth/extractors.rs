use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::jwt::TokenKeys;
use crate::error::AuthError;

/// Pulls the bearer token out of the Authorization header, requiring the
/// exact two-token `Bearer <token>` shape.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let mut pieces = header.split(' ');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Gate for general routes: the token must validate under one of the
/// configured tier secrets, tried in order. Admits the request with no
/// further context; handlers re-derive identity from the payload.
pub struct RequireAuth;

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Missing or malformed header gets the same generic rejection so
        // callers learn nothing about which tier was attempted.
        let token = bearer_token(parts).ok_or(AuthError::Unauthenticated)?;

        let keys = TokenKeys::from_ref(state);
        match keys.verify_any(token) {
            Some((tier, claims)) => {
                debug!(subject = %claims.sub, tier = ?tier, "bearer token accepted");
                Ok(RequireAuth)
            }
            None => {
                warn!("token verification failed");
                Err(AuthError::TokenInvalid)
            }
        }
    }
}

/// Gate for admin routes: the token must validate against the admin-tier
/// secret specifically. Every failure mode gets the same 403.
pub struct AdminUser {
    pub subject: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::AdminRequired)?;

        let keys = TokenKeys::from_ref(state);
        match keys.verify_admin(token) {
            Some(claims) => Ok(AdminUser {
                subject: claims.sub,
            }),
            None => {
                warn!("admin access refused");
                Err(AuthError::AdminRequired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Clone)]
    struct TestState(TokenKeys);

    impl FromRef<TestState> for TokenKeys {
        fn from_ref(state: &TestState) -> Self {
            state.0.clone()
        }
    }

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn bearer_token_requires_exact_shape() {
        assert!(bearer_token(&parts_with_header(None)).is_none());
        assert!(bearer_token(&parts_with_header(Some("Bearer"))).is_none());
        assert!(bearer_token(&parts_with_header(Some("Basic abc"))).is_none());
        assert!(bearer_token(&parts_with_header(Some("Bearer a b"))).is_none());
        assert_eq!(
            bearer_token(&parts_with_header(Some("Bearer abc"))),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn admin_user_carries_the_token_subject() {
        let keys = TokenKeys::new("admin-secret", "admin-secret", 1);
        let id = Uuid::new_v4();
        let token = keys.sign(id).expect("sign");
        let state = TestState(TokenKeys::new("user-secret", "admin-secret", 1));

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let admin = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .expect("admin token should be accepted");
        assert_eq!(admin.subject, id);
    }

    #[tokio::test]
    async fn user_tier_token_is_not_admin() {
        let state = TestState(TokenKeys::new("user-secret", "admin-secret", 1));
        let token = TokenKeys::new("user-secret", "admin-secret", 1)
            .sign(Uuid::new_v4())
            .expect("sign");

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        assert!(RequireAuth::from_request_parts(&mut parts, &state)
            .await
            .is_ok());

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let err = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("user tier must not pass the admin gate");
        assert!(matches!(err, AuthError::AdminRequired));
    }
}
