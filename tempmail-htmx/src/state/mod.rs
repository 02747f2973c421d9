//! Application state shared by every handler

use std::sync::Arc;

use anyhow::Context;

use crate::config::TempmailConfig;
use crate::refresh::RefreshRegistry;
use crate::store::Store;

/// Shared state: configuration, entity store and refresh trackers
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    config: Arc<TempmailConfig>,
    store: Arc<Store>,
    refresh: Arc<RefreshRegistry>,
}

impl AppState {
    /// Build state from `config`
    ///
    /// Rehydrates the persisted store. When nothing was persisted and the
    /// configuration carries an API key, that key is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted store exists but cannot be read.
    pub fn with_config(config: TempmailConfig) -> anyhow::Result<Self> {
        let store = Store::from_settings(config.api.client_config(), &config.store);
        store.rehydrate().context("Failed to load persisted store")?;

        if !store.is_authenticated() {
            if let Some(key) = config.api.api_key.as_deref() {
                if let Err(e) = store.set_api_key(key) {
                    tracing::warn!(error = %e, "Configured API key rejected");
                }
            }
        }

        let refresh = RefreshRegistry::new(config.refresh.manual_cooldown());
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            refresh: Arc::new(refresh),
        })
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &TempmailConfig {
        &self.config
    }

    /// Entity store
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Refresh trackers
    #[must_use]
    pub fn refresh(&self) -> &RefreshRegistry {
        &self.refresh
    }
}
