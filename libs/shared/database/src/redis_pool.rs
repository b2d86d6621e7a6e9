use deadpool_redis::{Config, Connection, Pool, Runtime};
use thiserror::Error;
use tracing::{debug, info};

use shared_config::AppConfig;

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Error, Debug)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    Create(String),

    #[error("Failed to get Redis connection: {0}")]
    Connection(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Thin wrapper around the deadpool Redis pool shared by the Redis-backed stores.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
    key_prefix: String,
}

impl RedisPool {
    pub async fn connect(config: &AppConfig) -> Result<Self, RedisPoolError> {
        let redis_url = config.redis_url.clone()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        Self::connect_url(&redis_url, "").await
    }

    /// `key_prefix` namespaces every key; tests use a random prefix per run.
    pub async fn connect_url(redis_url: &str, key_prefix: &str) -> Result<Self, RedisPoolError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RedisPoolError::Create(e.to_string()))?;

        let redis_pool = Self {
            pool,
            key_prefix: key_prefix.to_string(),
        };

        let mut conn = redis_pool.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis pool initialized successfully");

        Ok(redis_pool)
    }

    pub async fn connection(&self) -> Result<Connection, RedisPoolError> {
        self.pool.get().await.map_err(|e| {
            debug!("Redis connection checkout failed: {}", e);
            RedisPoolError::Connection(e.to_string())
        })
    }

    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}
