use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use std::{env, fs, path::PathBuf};

use autoshort_api::client::config::{ClientConfig, Credentials};

use crate::settings::consts::{
    API_URL_VAR, APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, PASSWORD_VAR, SESSIONS_FILE,
    USERNAME_VAR, WEBSOCKET_VAR,
};

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(rename = "username")]
    pub username: Option<String>,
    #[serde(rename = "password")]
    pub password: Option<String>,
    #[serde(rename = "apiUrl")]
    pub api_url: Option<String>,
    #[serde(rename = "websocket")]
    pub stream_endpoint: Option<String>,
}

impl Settings {
    /// Fill the fields missing here from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            api_url: self.api_url.or(fallback.api_url),
            stream_endpoint: self.stream_endpoint.or(fallback.stream_endpoint),
        }
    }

    /// Client configuration for these settings. Missing required fields are fatal.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let username = required(&self.username, USERNAME_VAR)?;
        let password = required(&self.password, PASSWORD_VAR)?;
        let api_url = required(&self.api_url, API_URL_VAR)?;

        let credentials = Credentials::new(username, password, api_url)?;
        Ok(ClientConfig::new(credentials).with_stream_endpoint(self.stream_endpoint.clone()))
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing \"{}\" env variable.", name))
}

pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Settings read from `USERNAME`, `PASSWORD`, `API_URL` and `WEBSOCKET`.
pub struct EnvSettingsStore {
    lookup: Lookup,
}

impl EnvSettingsStore {
    pub fn new() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }
}

impl Default for EnvSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for EnvSettingsStore {
    fn load(&self) -> Result<Settings> {
        Ok(Settings {
            username: self.var(USERNAME_VAR),
            password: self.var(PASSWORD_VAR),
            api_url: self.var(API_URL_VAR),
            stream_endpoint: self.var(WEBSOCKET_VAR),
        })
    }
}

pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> Result<Settings> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;
        from_str(&content).context("Failed to deserialize settings")
    }
}

/// Stores consulted in order; earlier stores win field by field.
pub struct LayeredSettingsStore {
    layers: Vec<Box<dyn SettingsStore>>,
}

impl LayeredSettingsStore {
    pub fn new(layers: Vec<Box<dyn SettingsStore>>) -> Self {
        Self { layers }
    }
}

impl SettingsStore for LayeredSettingsStore {
    fn load(&self) -> Result<Settings> {
        self.layers
            .iter()
            .try_fold(Settings::default(), |settings, layer| {
                Ok(settings.or(layer.load()?))
            })
    }
}

/// Session cache location inside the platform data directory:
///   - Windows:   %APPDATA%\<org>\<app>\data\sessions.json
///   - macOS:     ~/Library/Application Support/<qualifier>.<org>.<app>/sessions.json
///   - Linux:     ~/.local/share/<app>/sessions.json
pub fn default_sessions_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .ok_or_else(|| anyhow!("Could not determine project directories"))?;
    Ok(project_dirs.data_dir().join(SESSIONS_FILE))
}
