pub mod cli;
pub mod commands;
pub mod services;
pub mod settings;

use anyhow::Result;
use tracing::info;

use cli::{Cli, Commands};
use services::SessionCache;
use settings::{
    default_sessions_path, EnvSettingsStore, JsonFileSettingsStore, LayeredSettingsStore,
    SettingsStore,
};

pub struct AppCtx {
    pub settings_store: Box<dyn SettingsStore>,
    pub session_cache: SessionCache,
    pub verbose: bool,
}

impl AppCtx {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut layers: Vec<Box<dyn SettingsStore>> = Vec::new();
        if let Some(path) = &cli.credentials {
            layers.push(Box::new(JsonFileSettingsStore::new(path.clone())));
        }
        layers.push(Box::new(EnvSettingsStore::new()));

        let session_cache = if cli.no_session_cache {
            SessionCache::Disabled
        } else {
            match &cli.sessions {
                Some(path) => SessionCache::File(path.clone()),
                None => SessionCache::File(default_sessions_path()?),
            }
        };

        Ok(Self {
            settings_store: Box::new(LayeredSettingsStore::new(layers)),
            session_cache,
            verbose: cli.verbose,
        })
    }
}

#[cfg(not(tarpaulin_include))]
pub async fn run(cli: Cli) -> Result<()> {
    info!(
        "Welcome to AutoShort CLI 👋 - Version {}",
        env!("CARGO_PKG_VERSION")
    );

    let ctx = AppCtx::from_cli(&cli)?;

    match cli.command {
        Commands::Quote(args) => commands::quote::handle(args, &ctx).await,
        Commands::Listen(args) => commands::listen::handle(args, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_ctx_session_cache() {
        let cli = Cli::try_parse_from(["autoshort", "--no-session-cache", "quote", "YPFD"]).unwrap();
        assert_eq!(AppCtx::from_cli(&cli).unwrap().session_cache, SessionCache::Disabled);

        let cli = Cli::try_parse_from(["autoshort", "--sessions", "/tmp/s.json", "-v", "quote", "YPFD"])
            .unwrap();
        let ctx = AppCtx::from_cli(&cli).unwrap();
        assert_eq!(ctx.session_cache, SessionCache::File(PathBuf::from("/tmp/s.json")));
        assert!(ctx.verbose);
    }

    #[test]
    fn test_ctx_credentials_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"username":"file-user","apiUrl":"https://api.broker.test"}"#)
            .unwrap();

        let cli = Cli::try_parse_from([
            "autoshort",
            "--credentials",
            path.to_str().unwrap(),
            "--no-session-cache",
            "listen",
        ])
        .unwrap();
        let settings = AppCtx::from_cli(&cli).unwrap().settings_store.load().unwrap();
        assert_eq!(settings.username.as_deref(), Some("file-user"));
        assert_eq!(settings.api_url.as_deref(), Some("https://api.broker.test"));
    }
}
