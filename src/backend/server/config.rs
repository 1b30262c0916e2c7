/**
 * Server Configuration
 *
 * Configuration is resolved in three layers, later layers winning:
 *
 * 1. Built-in defaults suitable for local development
 * 2. An optional TOML file named by `PULSECHAT_CONFIG`
 * 3. Environment variables (`BIND_ADDR`, `JWT_SECRET`, `DATABASE_URL`,
 *    `REDIS_URL`, `HEARTBEAT_SECS`, `HANDSHAKE_TIMEOUT_SECS`,
 *    `ENQUEUE_INTERVAL_SECS`, `COMPOSITION_HOUR`, `QUEUE_NAME`)
 *
 * # Error Handling
 *
 * A malformed file or value is a startup error. Backends that fail to
 * connect are logged and replaced by their in-memory counterparts, so the
 * server keeps running without them.
 */

use serde::Deserialize;
use sqlx::PgPool;
use std::time::Duration;

use crate::backend::error::BackendError;

/// Development-only signing secret, used when `JWT_SECRET` is unset
pub const DEV_JWT_SECRET: &str = "pulsechat-dev-secret-change-me";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds
    pub bind_addr: String,
    /// HS256 secret for session tokens
    pub jwt_secret: String,
    /// PostgreSQL URL; in-memory store and queue when absent
    pub database_url: Option<String>,
    /// Redis URL; in-memory presence when absent
    pub redis_url: Option<String>,
    pub heartbeat_secs: u64,
    /// Deadline for the first-frame authentication handshake
    pub handshake_timeout_secs: u64,
    pub enqueue_interval_secs: u64,
    /// UTC hour at which the daily composition job runs
    pub composition_hour: u32,
    pub queue_name: String,
    /// Outbound queue depth per connection
    pub connection_capacity: usize,
    /// Pause after a failed queue delivery before receiving again
    pub consumer_backoff_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database_url: None,
            redis_url: None,
            heartbeat_secs: 120,
            handshake_timeout_secs: 10,
            enqueue_interval_secs: 60,
            composition_hour: 2,
            queue_name: crate::backend::queue::DEFAULT_QUEUE_NAME.to_string(),
            connection_capacity: crate::backend::realtime::hub::DEFAULT_CONNECTION_CAPACITY,
            consumer_backoff_ms: 1_000,
        }
    }
}

impl ServerConfig {
    /// Load defaults, then the optional TOML file, then the environment
    pub fn load() -> Result<Self, BackendError> {
        let mut config = match std::env::var("PULSECHAT_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    BackendError::validation(format!("Cannot read config file {}: {}", path, e))
                })?;
                tracing::info!("[Server] Loaded configuration from {}", path);
                Self::from_toml_str(&text)?
            }
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        if config.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("[Server] JWT_SECRET not set, using the development secret");
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, BackendError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| BackendError::validation(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style key lookups
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), BackendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("JWT_SECRET") {
            self.jwt_secret = v;
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = get("REDIS_URL") {
            self.redis_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = get("HEARTBEAT_SECS") {
            self.heartbeat_secs = parse_var("HEARTBEAT_SECS", &v)?;
        }
        if let Some(v) = get("HANDSHAKE_TIMEOUT_SECS") {
            self.handshake_timeout_secs = parse_var("HANDSHAKE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("ENQUEUE_INTERVAL_SECS") {
            self.enqueue_interval_secs = parse_var("ENQUEUE_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("COMPOSITION_HOUR") {
            self.composition_hour = parse_var("COMPOSITION_HOUR", &v)?;
        }
        if let Some(v) = get("QUEUE_NAME") {
            self.queue_name = v;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), BackendError> {
        if self.composition_hour > 23 {
            return Err(BackendError::validation("COMPOSITION_HOUR must be between 0 and 23"));
        }
        if self.heartbeat_secs == 0 || self.enqueue_interval_secs == 0 || self.handshake_timeout_secs == 0 {
            return Err(BackendError::validation("Intervals and timeouts must be positive"));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn enqueue_interval(&self) -> Duration {
        Duration::from_secs(self.enqueue_interval_secs)
    }

    pub fn consumer_backoff(&self) -> Duration {
        Duration::from_millis(self.consumer_backoff_ms)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, BackendError> {
    value
        .trim()
        .parse()
        .map_err(|_| BackendError::validation(format!("Invalid value for {}: {}", key, value)))
}

/// Connect to PostgreSQL and run migrations
///
/// # Returns
///
/// - `Some(PgPool)` if the database is reachable
/// - `None` if the connection fails; the caller falls back to memory
pub async fn load_database(database_url: &str) -> Option<PgPool> {
    tracing::info!("[Server] Connecting to database...");

    let pool = match PgPool::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("[Server] Failed to create database connection pool: {:?}", e);
            tracing::warn!("[Server] Falling back to the in-memory store and queue");
            return None;
        }
    };

    tracing::info!("[Server] Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("[Server] Database migrations completed"),
        Err(e) => {
            tracing::error!("[Server] Failed to run database migrations: {}", e);
            tracing::warn!("[Server] Continuing; the schema may be out of date");
        }
    }

    Some(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(120));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(config.enqueue_interval(), Duration::from_secs(60));
        assert_eq!(config.composition_hour, 2);
    }

    #[test]
    fn test_toml_then_env() {
        let mut config = ServerConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:9000"
            heartbeat_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.enqueue_interval_secs, 60);

        let env: HashMap<&str, &str> = [("HEARTBEAT_SECS", "45"), ("DATABASE_URL", "")].into();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.heartbeat_secs, 45);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ServerConfig::default();
        assert_matches!(
            config.apply_env(|k| (k == "COMPOSITION_HOUR").then(|| "24".to_string())),
            Err(BackendError::Validation { .. })
        );
        assert_matches!(
            ServerConfig::default().apply_env(|k| (k == "HEARTBEAT_SECS").then(|| "soon".to_string())),
            Err(BackendError::Validation { .. })
        );
        assert!(ServerConfig::from_toml_str("heartbeat_secs = \"x\"").is_err());
    }
}
