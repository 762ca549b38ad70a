mod consts;
mod logging;
mod settings;

pub use logging::init_logger;
pub use settings::{
    default_sessions_path, EnvSettingsStore, JsonFileSettingsStore, LayeredSettingsStore,
    Settings, SettingsStore,
};
