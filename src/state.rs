use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::code::RandomCodeGenerator;
use crate::auth::jwt::TokenKeys;
use crate::auth::password::Argon2Hasher;
use crate::auth::service::AccountService;
use crate::config::AppConfig;
use crate::repo::PgRepo;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub service: AccountService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        let keys = TokenKeys::new(
            &config.user_token_secret,
            &config.admin_token_secret,
            config.token_ttl_hours,
        );
        let service = AccountService::new(
            Arc::new(PgRepo::new(db.clone())),
            Arc::new(Argon2Hasher),
            Arc::new(RandomCodeGenerator::new(
                config.verification.code_length,
                config.verification.max_retries,
            )),
            Arc::new(keys),
            config.verification.code_ttl_hours,
        );

        Self {
            db,
            config,
            service,
        }
    }
}
