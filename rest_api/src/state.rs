// rest_api/src/state.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use tracing::debug;

use lib::{AppConfig, Checkout, PrectaStorage};
use security::{RolesConfig, SessionKeys};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn PrectaStorage>,
    pub config: Arc<AppConfig>,
    pub checkout: Arc<Checkout>,
    pub keys: SessionKeys,
    pub roles: Arc<RolesConfig>,
    /// Client used by the `/auth` proxy. Redirects are relayed, not followed.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn PrectaStorage>) -> Result<Self> {
        let roles = RolesConfig::load(config.auth.roles_file.as_deref())
            .context("failed to load the role permission table")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.auth.proxy_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build the auth proxy client")?;
        debug!("Loaded permissions for {} roles", roles.roles.len());

        Ok(AppState {
            checkout: Arc::new(Checkout::from_config(&config)),
            keys: SessionKeys::from_secret(&config.auth.session_secret),
            roles: Arc::new(roles),
            storage,
            http,
            config: Arc::new(config),
        })
    }

    pub fn storage(&self) -> &dyn PrectaStorage {
        self.storage.as_ref()
    }

    pub fn cancellation_notice(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.config.booking.cancellation_notice_minutes)
    }
}
