// lib/src/config/config_structs.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config_defaults::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineType {
    Memory,
    Postgres,
}

impl FromStr for StorageEngineType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" => Ok(StorageEngineType::Memory),
            "postgres" | "postgresql" => Ok(StorageEngineType::Postgres),
            _ => Err(anyhow::anyhow!("Unknown storage engine type: {}", s)),
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineType::Memory => f.write_str("memory"),
            StorageEngineType::Postgres => f.write_str("postgres"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub payments: PaymentConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL of this API as the frontend sees it (`VITE_API_URL`).
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Browser origin allowed by CORS; any origin when unset.
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            allowed_origin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_engine_type")]
    pub engine: StorageEngineType,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Apply pending migrations when the server starts.
    #[serde(default)]
    pub migrate_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            engine: default_storage_engine_type(),
            database_url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            migrate_on_start: false,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the auth provider for session tokens.
    #[serde(default)]
    pub session_secret: String,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    #[serde(default = "default_auth_provider_url")]
    pub provider_url: String,
    #[serde(default = "default_auth_proxy_timeout_secs")]
    pub proxy_timeout_secs: u64,
    /// Role/permission table; the bundled table is used when unset.
    #[serde(default)]
    pub roles_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            session_secret: String::new(),
            session_cookie: default_session_cookie(),
            provider_url: default_auth_provider_url(),
            proxy_timeout_secs: default_auth_proxy_timeout_secs(),
            roles_file: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .field("session_cookie", &self.session_cookie)
            .field("provider_url", &self.provider_url)
            .field("proxy_timeout_secs", &self.proxy_timeout_secs)
            .field("roles_file", &self.roles_file)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            gateway_url: default_gateway_url(),
            webhook_secret: String::new(),
            default_currency: default_currency(),
        }
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("gateway_url", &self.gateway_url)
            .field("webhook_secret", &"<redacted>")
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Minimum lead time for cancelling an appointment.
    #[serde(default = "default_cancellation_notice_minutes")]
    pub cancellation_notice_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            cancellation_notice_minutes: default_cancellation_notice_minutes(),
        }
    }
}
