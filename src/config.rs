use anyhow::Context;

/// The verification table's code column is VARCHAR(255).
const CODE_LENGTH_CEILING: usize = 255;

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub code_length: usize,
    pub max_retries: i32,
    pub code_ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub user_token_secret: String,
    pub admin_token_secret: String,
    pub token_ttl_hours: i64,
    pub verification: VerificationConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("AUTH_HOST_ADDR").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("AUTH_HOST_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(80);

        let database_url = std::env::var("AUTH_DB_CONNECTION_STRING")
            .context("AUTH_DB_CONNECTION_STRING requires a value")?;
        let user_token_secret = std::env::var("AUTH_USER_TOKEN_SECRET")
            .context("AUTH_USER_TOKEN_SECRET requires a value")?;
        let admin_token_secret = std::env::var("AUTH_ADMIN_TOKEN_SECRET")
            .context("AUTH_ADMIN_TOKEN_SECRET requires a value")?;

        let verification = VerificationConfig {
            code_length: env_int("AUTH_VERIFICATION_CODE_LENGTH", 6).min(CODE_LENGTH_CEILING),
            max_retries: env_int("AUTH_VERIFICATION_MAX_RETRIES", 3) as i32,
            code_ttl_hours: env_int("AUTH_VERIFICATION_CODE_TTL_HOURS", 24) as i64,
        };

        Ok(Self {
            host,
            port,
            database_url,
            user_token_secret,
            admin_token_secret,
            token_ttl_hours: env_int("AUTH_TOKEN_TTL_HOURS", 24) as i64,
            verification,
        })
    }
}

/// Reads a positive integer from the environment, falling back to `default`
/// when the variable is unset, unparsable, or not positive.
fn env_int(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
