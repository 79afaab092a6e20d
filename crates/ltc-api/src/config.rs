//! API configuration.

use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Shared webhook secret; unset accepts every call
    pub webhook_secret: Option<String>,
    /// How long finished workflows stay pollable
    pub workflow_retention: Duration,
    /// Upper bound on tracked workflows
    pub workflow_max_entries: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 16 * 1024 * 1024, // 16MB
            environment: "development".to_string(),
            webhook_secret: None,
            workflow_retention: Duration::from_secs(3600),
            workflow_max_entries: 1000,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            workflow_retention: std::env::var("WORKFLOW_RETENTION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.workflow_retention),
            workflow_max_entries: std::env::var("WORKFLOW_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.workflow_max_entries),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("API_PORT", "9000");
        std::env::set_var("WEBHOOK_SECRET", "shh");
        std::env::set_var("WORKFLOW_MAX_ENTRIES", "0");
        std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 9000);
        assert_eq!(config.webhook_secret.as_deref(), Some("shh"));
        assert_eq!(config.workflow_max_entries, 1000);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);

        for key in ["API_PORT", "WEBHOOK_SECRET", "WORKFLOW_MAX_ENTRIES", "CORS_ORIGINS"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_blank_secret_is_unset() {
        std::env::set_var("WEBHOOK_SECRET", "  ");
        assert!(ApiConfig::from_env().webhook_secret.is_none());
        std::env::remove_var("WEBHOOK_SECRET");
    }
}
