// lib/src/config/config_defaults.rs

use super::config_structs::StorageEngineType;

pub const DEFAULT_CONFIG_FILE_STEM: &str = "precta";
pub const ENV_PREFIX: &str = "PRECTA";
pub const DEFAULT_SESSION_COOKIE: &str = "precta_session";

pub fn default_host() -> String { "0.0.0.0".to_string() }
pub fn default_port() -> u16 { 8082 }
pub fn default_public_url() -> String { "http://localhost:8082".to_string() }
pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Postgres }
pub fn default_max_connections() -> u32 { 10 }
pub fn default_acquire_timeout_secs() -> u64 { 5 }
pub fn default_session_cookie() -> String { DEFAULT_SESSION_COOKIE.to_string() }
pub fn default_auth_provider_url() -> String { "http://localhost:3001".to_string() }
pub fn default_auth_proxy_timeout_secs() -> u64 { 10 }
pub fn default_gateway_url() -> String { "https://checkout.example-pay.test".to_string() }
pub fn default_currency() -> String { "KES".to_string() }
pub fn default_cancellation_notice_minutes() -> i64 { 120 }
