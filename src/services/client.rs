use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info};

use crate::settings::SettingsStore;
use autoshort_api::{
    session::{JsonFileSessionStore, SessionStore},
    AutoShortClient,
};

/// Where sessions are reused from and recorded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCache {
    Disabled,
    File(PathBuf),
}

impl SessionCache {
    fn open(&self) -> Option<Arc<dyn SessionStore>> {
        match self {
            SessionCache::Disabled => None,
            SessionCache::File(path) => {
                debug!(path = %path.display(), "Using session cache");
                Some(Arc::new(JsonFileSessionStore::open(path.clone())))
            }
        }
    }
}

pub struct ClientService<'a> {
    settings_store: &'a dyn SettingsStore,
    session_cache: &'a SessionCache,
    verbose: bool,
}

impl<'a> ClientService<'a> {
    pub fn new(
        settings_store: &'a dyn SettingsStore,
        session_cache: &'a SessionCache,
        verbose: bool,
    ) -> Self {
        Self {
            settings_store,
            session_cache,
            verbose,
        }
    }

    /// Build a client from the stored settings. Its login starts right away, unless a fresh
    /// cached session can be reused.
    ///
    /// # Errors
    ///
    /// Missing or invalid settings, or an HTTP client that cannot be built.
    pub fn connect(&self, login_timeout: Duration) -> Result<AutoShortClient> {
        let settings = self.settings_store.load()?;
        let config = settings
            .client_config()?
            .with_verbose(self.verbose)
            .with_login_timeout(login_timeout);

        info!(
            "We'll try to log you in with your username: {}",
            config.credentials.username().masked()
        );

        AutoShortClient::new(config, self.session_cache.open())
            .context("Failed to build the API client")
    }

    /// The websocket endpoint from `override_endpoint` or the stored settings.
    pub fn stream_endpoint(&self, override_endpoint: Option<String>) -> Result<Option<String>> {
        let endpoint = match override_endpoint {
            Some(endpoint) => Some(endpoint),
            None => self.settings_store.load()?.stream_endpoint,
        };
        Ok(endpoint.filter(|e| !e.trim().is_empty()))
    }
}
