use std::env;

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;
const DEFAULT_ADMIN_EMAIL: &str = "admin@university.ru";
const DEFAULT_ADMIN_PASSWORD: &str = "change-me";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub session_ttl_days: i64,
    pub bootstrap_admin: BootstrapAdmin,
}

/// Account created on startup when the users table has no admin.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|err| anyhow!("PORT must be a port number: {err}"))?,
            Err(_) => DEFAULT_PORT,
        };

        let session_ttl_days = match env::var("SESSION_TTL_DAYS") {
            Ok(raw) => parse_ttl_days(&raw)?,
            Err(_) => DEFAULT_SESSION_TTL_DAYS,
        };

        let bootstrap_admin = BootstrapAdmin {
            email: env::var("BOOTSTRAP_ADMIN_EMAIL")
                .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string()),
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string()),
        };

        Ok(Self {
            database_url,
            port,
            session_ttl_days,
            bootstrap_admin,
        })
    }

    /// Configuration for tests and tools that supply their own database url.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: DEFAULT_PORT,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            bootstrap_admin: BootstrapAdmin {
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
            },
        }
    }
}

fn parse_ttl_days(raw: &str) -> Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .map_err(|err| anyhow!("SESSION_TTL_DAYS must be an integer: {err}"))?;
    if days <= 0 {
        return Err(anyhow!("SESSION_TTL_DAYS must be positive"));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_must_be_positive() {
        assert_eq!(parse_ttl_days("14").unwrap(), 14);
        assert!(parse_ttl_days("0").is_err());
        assert!(parse_ttl_days("week").is_err());
    }

    #[test]
    fn defaults_for_explicit_database_url() {
        let config = AppConfig::with_database_url("postgres://localhost/metrics");
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_ttl_days, 7);
        assert_eq!(config.bootstrap_admin.email, "admin@university.ru");
    }
}
