use anyhow::Context;
use serde::Deserialize;

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> anyhow::Result<Option<i64>> {
            lookup(key)
                .map(|v| v.parse::<i64>().with_context(|| format!("{key} must be an integer")))
                .transpose()
        };

        let url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let secret = lookup("JWT_SECRET").context("JWT_SECRET is not set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let ttl_minutes = parsed("JWT_TTL_MINUTES")?.unwrap_or(60);
        if ttl_minutes <= 0 {
            anyhow::bail!("JWT_TTL_MINUTES must be positive");
        }
        if ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!("JWT_TTL_MINUTES must be at most {MAX_TTL_MINUTES}");
        }

        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "bookex".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "bookex-users".into()),
            ttl_minutes,
        };
        let db = DbConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS")?.unwrap_or(10).max(1) as u32,
            acquire_timeout_secs: parsed("DB_ACQUIRE_TIMEOUT_SECS")?.unwrap_or(5).max(1) as u64,
        };

        Ok(Self {
            db,
            jwt,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed("APP_PORT")?
                .map(u16::try_from)
                .transpose()
                .context("APP_PORT out of range")?
                .unwrap_or(3000),
        })
    }
}
