use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub database_url: String,
    pub secret_key: String,
    pub ttl_minutes: i64,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub per_page: i64,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        Self::with_database_url(database_url)
    }

    /// Same as [`AppConfig::from_env`] but without requiring `DATABASE_URL`,
    /// for the in-memory mode.
    pub fn from_env_in_memory() -> anyhow::Result<Self> {
        Self::with_database_url(std::env::var("DATABASE_URL").unwrap_or_default())
    }

    fn with_database_url(database_url: String) -> anyhow::Result<Self> {
        let secret_key = std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?;
        anyhow::ensure!(!secret_key.is_empty(), "SECRET_KEY must not be empty");

        let session = SessionConfig {
            database_url: std::env::var("SESSION_DATABASE_URL")
                .unwrap_or_else(|_| database_url.clone()),
            secret_key,
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 24 * 14),
            secure_cookie: env_parse("SESSION_COOKIE_SECURE").unwrap_or(false),
        };

        Ok(Self {
            database_url,
            max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            per_page: env_parse("PER_PAGE").filter(|n| *n > 0).unwrap_or(30),
            session,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
