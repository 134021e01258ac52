use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// Which secret signed a bearer token. Admin-only routes demand `Admin`;
/// general routes accept either tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustTier {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signs login tokens with the user-tier secret and verifies presented
/// tokens against the ordered tier list. No server-side session state; a
/// token is self-contained.
#[derive(Clone)]
pub struct TokenKeys {
    signing: EncodingKey,
    tiers: Vec<(TrustTier, DecodingKey)>,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(user_secret: &str, admin_secret: &str, ttl_hours: i64) -> Self {
        Self {
            signing: EncodingKey::from_secret(user_secret.as_bytes()),
            tiers: vec![
                (TrustTier::User, DecodingKey::from_secret(user_secret.as_bytes())),
                (TrustTier::Admin, DecodingKey::from_secret(admin_secret.as_bytes())),
            ],
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Mints a user-tier token asserting `sub = user_id`.
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.signing)?;
        debug!(user_id = %user_id, "token signed");
        Ok(token)
    }

    fn validation() -> Validation {
        let mut validation = Validation::default();
        // Expiry is a hard boundary, no clock-skew grace.
        validation.leeway = 0;
        validation
    }

    /// Tries each configured tier in order; the first secret that validates
    /// both signature and expiry wins.
    pub fn verify_any(&self, token: &str) -> Option<(TrustTier, Claims)> {
        let validation = Self::validation();
        self.tiers.iter().find_map(|(tier, key)| {
            decode::<Claims>(token, key, &validation)
                .ok()
                .map(|data| (*tier, data.claims))
        })
    }

    /// Admin routes must validate against the admin-tier secret
    /// specifically; a token good only under the user secret is refused.
    pub fn verify_admin(&self, token: &str) -> Option<Claims> {
        let validation = Self::validation();
        self.tiers
            .iter()
            .find(|(tier, _)| *tier == TrustTier::Admin)
            .and_then(|(_, key)| decode::<Claims>(token, key, &validation).ok())
            .map(|data| data.claims)
    }
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        TokenKeys::new(
            &state.config.user_token_secret,
            &state.config.admin_token_secret,
            state.config.token_ttl_hours,
        )
    }
}

/// Capability the account service uses to mint login tokens.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: Uuid) -> anyhow::Result<String>;
}

impl TokenIssuer for TokenKeys {
    fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign(user_id)
    }
}

#[cfg(test)]
pub struct StaticIssuer;

#[cfg(test)]
impl TokenIssuer for StaticIssuer {
    fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        Ok(format!("token-for-{user_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new("user-secret", "admin-secret", 24)
    }

    #[test]
    fn user_token_validates_as_user_tier() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let (tier, claims) = keys.verify_any(&token).expect("verify");
        assert_eq!(tier, TrustTier::User);
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn user_token_is_not_admin() {
        let keys = keys();
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert!(keys.verify_admin(&token).is_none());
    }

    #[test]
    fn admin_signed_token_passes_both_checks() {
        let keys = keys();
        // a token minted under the admin secret, as the admin tooling would
        let admin_side = TokenKeys::new("admin-secret", "unused", 24);
        let token = admin_side.sign(Uuid::new_v4()).expect("sign");
        let (tier, _) = keys.verify_any(&token).expect("verify");
        assert_eq!(tier, TrustTier::Admin);
        assert!(keys.verify_admin(&token).is_some());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let keys = keys();
        let other = TokenKeys::new("some-other-secret", "unused", 24);
        let token = other.sign(Uuid::new_v4()).expect("sign");
        assert!(keys.verify_any(&token).is_none());
        assert!(keys.verify_admin(&token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("user-secret", "admin-secret", -1);
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert!(keys.verify_any(&token).is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(keys().verify_any("not.a.jwt").is_none());
    }
}
