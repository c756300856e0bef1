// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_structs;

use std::env;
use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use models::errors::{PrectaError, PrectaResult};
use tracing::{debug, info};

pub use config_defaults::*;
pub use config_structs::{
    AppConfig, AuthConfig, BookingConfig, PaymentConfig, ServerConfig, StorageConfig,
    StorageEngineType,
};

/// Well-known deployment variables and the config keys they override.
const WELL_KNOWN_ENV: &[(&str, &str)] = &[
    ("DATABASE_URL", "storage.database_url"),
    ("VITE_API_URL", "server.public_url"),
    ("PORT", "server.port"),
    ("SESSION_SECRET", "auth.session_secret"),
    ("AUTH_PROVIDER_URL", "auth.provider_url"),
    ("PAYMENT_GATEWAY_URL", "payments.gateway_url"),
    ("PAYMENT_WEBHOOK_SECRET", "payments.webhook_secret"),
    ("FRONTEND_ORIGIN", "server.allowed_origin"),
];

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the config file
/// (`config_file` if given, otherwise an optional `precta.{toml,yaml,json}`
/// in the working directory), `PRECTA__SECTION__KEY` variables, and finally
/// the well-known deployment variables such as `DATABASE_URL`.
pub fn load_config(config_file: Option<&Path>) -> PrectaResult<AppConfig> {
    // A missing .env file is normal outside development.
    if dotenv::dotenv().is_ok() {
        debug!("Loaded environment from .env");
    }
    load_config_with(config_file, &|key| env::var(key).ok())
}

/// Same as [`load_config`] with an explicit lookup for the well-known variables.
pub fn load_config_with(
    config_file: Option<&Path>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> PrectaResult<AppConfig> {
    let mut builder = Config::builder();

    builder = match config_file {
        Some(path) => {
            info!("Reading configuration from {}", path.display());
            builder.add_source(File::from(path).required(true))
        }
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE_STEM).required(false)),
    };

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__"),
    );
    builder = apply_well_known(builder, lookup)?;

    let config: AppConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| PrectaError::ConfigurationError(e.to_string()))?;

    validate(&config)?;
    Ok(config)
}

fn apply_well_known(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> PrectaResult<ConfigBuilder<DefaultState>> {
    for (var, key) in WELL_KNOWN_ENV {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            debug!("{var} overrides {key}");
            builder = builder
                .set_override(*key, value)
                .map_err(|e| PrectaError::ConfigurationError(e.to_string()))?;
        }
    }
    Ok(builder)
}

/// Rejects configurations the server cannot start with.
pub fn validate(config: &AppConfig) -> PrectaResult<()> {
    if config.storage.engine == StorageEngineType::Postgres
        && config.storage.database_url.as_deref().map_or(true, str::is_empty)
    {
        return Err(PrectaError::ConfigurationError(
            "storage.database_url (or DATABASE_URL) is required for the postgres engine".to_string(),
        ));
    }
    if config.auth.session_secret.trim().is_empty() {
        return Err(PrectaError::ConfigurationError(
            "auth.session_secret (or SESSION_SECRET) must be set".to_string(),
        ));
    }
    if config.booking.cancellation_notice_minutes < 0 {
        return Err(PrectaError::ConfigurationError(
            "booking.cancellation_notice_minutes cannot be negative".to_string(),
        ));
    }
    Ok(())
}

impl AppConfig {
    /// A copy safe to print: secrets and database credentials are masked.
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        if !copy.auth.session_secret.is_empty() {
            copy.auth.session_secret = "<redacted>".to_string();
        }
        if !copy.payments.webhook_secret.is_empty() {
            copy.payments.webhook_secret = "<redacted>".to_string();
        }
        if copy.storage.database_url.is_some() {
            copy.storage.database_url = Some("<redacted>".to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn well_known_variables_fill_required_settings() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://precta@localhost/precta"),
            ("SESSION_SECRET", "s3cret"),
            ("PORT", "9000"),
        ]);
        let file = write_toml("[server]\nhost = \"127.0.0.1\"\n");
        let config = load_config_with(Some(file.path()), &lookup).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.engine, StorageEngineType::Postgres);
        assert_eq!(
            config.storage.database_url.as_deref(),
            Some("postgres://precta@localhost/precta")
        );
        assert_eq!(config.booking.cancellation_notice_minutes, 120);
    }

    #[test]
    fn postgres_without_database_url_is_rejected() {
        let file = write_toml("[auth]\nsession_secret = \"x\"\n");
        let err = load_config_with(Some(file.path()), &lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    #[test]
    fn memory_engine_needs_only_a_secret() {
        let file = write_toml("[storage]\nengine = \"memory\"\n[auth]\nsession_secret = \"x\"\n");
        let config = load_config_with(Some(file.path()), &lookup_from(&[])).unwrap();
        assert_eq!(config.storage.engine, StorageEngineType::Memory);
        assert!(config.storage.database_url.is_none());
    }

    #[test]
    fn redaction_masks_secrets() {
        let file = write_toml("[storage]\nengine = \"memory\"\n[auth]\nsession_secret = \"x\"\n");
        let config = load_config_with(Some(file.path()), &lookup_from(&[])).unwrap();
        let redacted = config.redacted();
        assert_eq!(redacted.auth.session_secret, "<redacted>");
        assert_eq!(redacted.payments.webhook_secret, "");
    }

    #[test]
    fn engine_type_parses_aliases() {
        assert_eq!("PostgreSQL".parse::<StorageEngineType>().unwrap(), StorageEngineType::Postgres);
        assert_eq!("inmemory".parse::<StorageEngineType>().unwrap(), StorageEngineType::Memory);
        assert!("mongodb".parse::<StorageEngineType>().is_err());
    }
}
