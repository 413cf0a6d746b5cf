use std::net::SocketAddr;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used outside development.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub pool_size: u32,
    pub jwt_secret: String,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let environment = match var("NOP_ENV").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => bail!("NOP_ENV must be development or production, got '{}'", other),
        };

        let jwt_secret = var("NOP_JWT_SECRET").unwrap_or_default();
        let jwt_secret = match environment {
            Environment::Production
                if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) =>
            {
                bail!("NOP_JWT_SECRET is unset or still a placeholder")
            }
            Environment::Development if jwt_secret.is_empty() => DEV_SECRET.to_string(),
            _ => jwt_secret,
        };

        let database_url = var("NOP_DATABASE_URL").unwrap_or_else(|| "sqlite://nop.db".into());
        let pool_size: u32 = var("NOP_DB_POOL_SIZE")
            .unwrap_or_else(|| "8".into())
            .parse()
            .context("NOP_DB_POOL_SIZE must be a number")?;

        let host = var("NOP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("NOP_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NOP_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            environment,
            database_url,
            pool_size,
            jwt_secret,
            addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_development() {
        let config = load(&[]).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.database_url, "sqlite://nop.db");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.jwt_secret, DEV_SECRET);
        assert_eq!(config.addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn production_refuses_placeholder_secrets() {
        assert!(load(&[("NOP_ENV", "production")]).is_err());
        assert!(load(&[("NOP_ENV", "production"), ("NOP_JWT_SECRET", DEV_SECRET)]).is_err());

        let config = load(&[("NOP_ENV", "production"), ("NOP_JWT_SECRET", "s3cr3t")]).unwrap();
        assert_eq!(config.jwt_secret, "s3cr3t");
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(load(&[("NOP_ENV", "staging")]).is_err());
        assert!(load(&[("NOP_PORT", "http")]).is_err());
        assert!(load(&[("NOP_DB_POOL_SIZE", "-1")]).is_err());
    }
}
