use anyhow::{bail, Result};
use std::env;

pub const DEFAULT_JWT_SECRET: &str = "tsness-dev-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let config = AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            jwt_expiration_hours,
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if self.jwt_expiration_hours <= 0 {
            bail!("JWT_EXPIRATION_HOURS must be positive");
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn config(environment: &str, secret: &str) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 3000,
            environment: environment.into(),
            log_level: "info".into(),
            jwt_secret: secret.into(),
            jwt_expiration_hours: 24,
        }
    }

    #[test]
    fn test_default_secret_rejected_in_production() {
        assert_err!(config("production", DEFAULT_JWT_SECRET).check());
        assert_ok!(config("production", "a-real-secret").check());
        assert_ok!(config("development", DEFAULT_JWT_SECRET).check());
    }

    #[test]
    fn test_non_positive_expiration_rejected() {
        let mut config = config("development", "s");
        config.jwt_expiration_hours = 0;
        assert_err!(config.check());
    }

    #[test]
    fn test_server_address() {
        let config = config("development", "s");
        assert_eq!(config.server_address(), "127.0.0.1:3000");
        assert!(config.is_development());
    }
}
