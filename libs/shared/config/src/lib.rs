use std::env;
use tracing::warn;

pub const DEFAULT_LOOKUP_CODE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    pub lookup_code_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| {
                    warn!("SERVER_HOST not set, using default");
                    "0.0.0.0".to_string()
                }),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SERVER_PORT not set or invalid, using default");
                    3000
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            lookup_code_attempts: env::var("LOOKUP_CODE_ATTEMPTS")
                .ok()
                .and_then(|attempts| attempts.parse().ok())
                .filter(|attempts| *attempts > 0)
                .unwrap_or(DEFAULT_LOOKUP_CODE_ATTEMPTS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    /// Tickets go to Redis when a URL is configured, otherwise they stay in process memory.
    pub fn uses_redis_ticket_store(&self) -> bool {
        self.redis_url.is_some()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            jwt_secret: String::new(),
            redis_url: None,
            lookup_code_attempts: DEFAULT_LOOKUP_CODE_ATTEMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert!(!config.uses_redis_ticket_store());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_redis_url_selects_redis_store() {
        let config = AppConfig {
            redis_url: Some("redis://localhost:6379".to_string()),
            jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
        assert!(config.uses_redis_ticket_store());
    }
}
