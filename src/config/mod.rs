use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling configuration at startup. All of them are
/// fatal: the process refuses to start on a missing secret or a malformed
/// store URI rather than limping along.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid MongoDB connection string: {0}")]
    InvalidStoreUri(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub security: SecurityConfig,
    pub smtp: SmtpConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Flat directory uploaded media is persisted to and served from.
    pub media_dir: PathBuf,
    /// Static SPA assets, served with an index.html fallback.
    pub public_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub relay: String,
    pub username: String,
    pub password: String,
    pub from: String,
    /// Inbox the contact form relays to.
    pub contact_inbox: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_limit: i64,
    pub max_page_limit: i64,
}

impl AppConfig {
    /// Build configuration from the process environment.
    ///
    /// Environment-specific defaults come first, specific env vars override
    /// them, and required secrets are checked last so a misconfigured
    /// deployment fails at startup instead of on the first request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let mut config = match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides();

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        config.security.jwt_secret = jwt_secret;

        let uri = env::var("MONGO_URI").map_err(|_| ConfigError::Missing("MONGO_URI"))?;
        let parsed = url::Url::parse(&uri).map_err(|e| ConfigError::InvalidStoreUri(e.to_string()))?;
        if !parsed.scheme().starts_with("mongodb") {
            return Err(ConfigError::InvalidStoreUri(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        config.store.uri = uri;

        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("MEDIA_DIR") {
            self.server.media_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("PUBLIC_DIR") {
            self.server.public_dir = PathBuf::from(v);
        }

        if let Ok(v) = env::var("MONGO_DB") {
            self.store.database = v;
        }

        if let Ok(v) = env::var("TOKEN_TTL_SECS") {
            self.security.token_ttl_secs = v.parse().unwrap_or(self.security.token_ttl_secs);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }

        if let Ok(v) = env::var("SMTP_RELAY") {
            self.smtp.relay = v;
        }
        if let Ok(v) = env::var("SMTP_USERNAME") {
            self.smtp.username = v;
        }
        if let Ok(v) = env::var("SMTP_APP_PASSWORD") {
            self.smtp.password = v;
        }
        if let Ok(v) = env::var("SMTP_FROM") {
            self.smtp.from = v;
        }
        if let Ok(v) = env::var("CONTACT_INBOX") {
            self.smtp.contact_inbox = v;
        }

        if let Ok(v) = env::var("API_DEFAULT_PAGE_LIMIT") {
            self.api.default_page_limit = v.parse().unwrap_or(self.api.default_page_limit);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_LIMIT") {
            self.api.max_page_limit = v.parse().unwrap_or(self.api.max_page_limit);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                media_dir: PathBuf::from("media"),
                public_dir: PathBuf::from("public"),
            },
            store: StoreConfig {
                uri: String::new(),
                database: "main".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                token_ttl_secs: 3600,
                bcrypt_cost: 10,
            },
            smtp: SmtpConfig {
                relay: "smtp.gmail.com".to_string(),
                username: String::new(),
                password: String::new(),
                from: "no-reply@volunflow.com".to_string(),
                contact_inbox: "volunflow@gmail.com".to_string(),
            },
            api: ApiConfig {
                default_page_limit: 10,
                max_page_limit: 1000,
            },
        }
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.api.max_page_limit = 100;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.security.token_ttl_secs, 3600);
        assert_eq!(config.api.default_page_limit, 10);
        assert_eq!(config.api.max_page_limit, 1000);
    }

    #[test]
    fn production_tightens_page_limit() {
        let config = AppConfig::production();
        assert!(matches!(config.environment, Environment::Production));
        assert_eq!(config.api.max_page_limit, 100);
    }
}
