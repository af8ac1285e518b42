use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdStrategyKind {
    Sequential,
    Opaque,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub id_strategy: IdStrategyKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    /// Public base URL used to build `uri` fields in responses.
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("MYTASKS_DATA_DIR") {
            self.storage.data_dir = v;
        }
        if let Ok(v) = env::var("MYTASKS_ID_STRATEGY") {
            self.storage.id_strategy = match v.as_str() {
                "sequential" => IdStrategyKind::Sequential,
                "opaque" => IdStrategyKind::Opaque,
                other => {
                    tracing::warn!(strategy = other, "unknown id strategy, keeping default");
                    self.storage.id_strategy
                }
            };
        }
        if let Ok(v) = env::var("SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("MYTASKS_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("MYTASKS_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("MYTASKS_BASE_URL") {
            self.api.base_url = v.trim_end_matches('/').to_string();
        }
        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            storage: StorageConfig {
                data_dir: "data".to_string(),
                id_strategy: IdStrategyKind::Opaque,
            },
            api: ApiConfig { port: 5000, base_url: "http://localhost:5000".to_string() },
            security: SecurityConfig {
                jwt_secret: "my_precious".to_string(),
                jwt_expiry_hours: 24 * 30,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            storage: StorageConfig {
                data_dir: "/var/lib/mytasks".to_string(),
                id_strategy: IdStrategyKind::Opaque,
            },
            api: ApiConfig { port: 5000, base_url: "http://localhost:5000".to_string() },
            security: SecurityConfig {
                // Must be overridden via SECRET_KEY in any real deployment.
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 30,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
