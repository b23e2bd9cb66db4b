use std::env;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use services::services::invite::DEFAULT_INVITE_TTL_HOURS;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    /// Base64-encoded HMAC key for the sticky-company cookie.
    cookie_secret: SecretString,
    pub invite_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("SERVER_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingVar("SERVER_DATABASE_URL"))?;

        let listen_addr =
            env::var("SERVER_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let cookie_secret = env::var("COOKIE_SIGNING_SECRET")
            .map_err(|_| ConfigError::MissingVar("COOKIE_SIGNING_SECRET"))?;
        validate_cookie_secret(&cookie_secret)?;
        let cookie_secret = SecretString::new(cookie_secret.into());

        let invite_ttl_hours = match env::var("INVITE_TTL_HOURS") {
            Ok(v) => v
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or(ConfigError::InvalidVar("INVITE_TTL_HOURS"))?,
            Err(_) => DEFAULT_INVITE_TTL_HOURS,
        };

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            invite_ttl: Duration::hours(invite_ttl_hours),
        })
    }

    /// Decoded HMAC key bytes for cookie signing.
    pub fn cookie_key(&self) -> Vec<u8> {
        BASE64_STANDARD
            .decode(self.cookie_secret.expose_secret().as_bytes())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            cookie_secret: SecretString::new(
                BASE64_STANDARD.encode([7u8; 32]).into(),
            ),
            invite_ttl: Duration::hours(DEFAULT_INVITE_TTL_HOURS),
        }
    }
}

fn validate_cookie_secret(secret: &str) -> Result<(), ConfigError> {
    let decoded = BASE64_STANDARD
        .decode(secret.as_bytes())
        .map_err(|_| ConfigError::InvalidVar("COOKIE_SIGNING_SECRET"))?;

    if decoded.len() < 32 {
        return Err(ConfigError::InvalidVar("COOKIE_SIGNING_SECRET"));
    }

    Ok(())
}
