use sqlx::mysql::MySqlConnectOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Startup configuration. Every variable is required; there are no
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_host: String,
    pub database_port: u16,
    pub database_user: String,
    pub database_password: String,
    pub database_name: String,
    pub session_secret: String,
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = require("DATABASE_PORT")?;
        let config = Config {
            database_host: require("DATABASE_HOST")?,
            database_port: port
                .parse()
                .map_err(|_| ConfigError::Invalid("DATABASE_PORT", port.clone()))?,
            database_user: require("DATABASE_USER")?,
            database_password: require("DATABASE_PASSWORD")?,
            database_name: require("DATABASE")?,
            session_secret: require("SESSION_SECRET")?,
        };
        // The cookie signing key is derived from the secret, which needs at
        // least 32 bytes of material.
        if config.session_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                "must be at least 32 bytes".to_owned(),
            ));
        }
        Ok(config)
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.database_host)
            .port(self.database_port)
            .username(&self.database_user)
            .password(&self.database_password)
            .database(&self.database_name)
    }
}
