pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "autoshort";
pub const APP_NAME: &str = "autoshort";

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const VERBOSE_LOG_LEVEL: &str = "debug";
pub const LOG_FILE: &str = "autoshort.log";

pub const SESSIONS_FILE: &str = "sessions.json";

pub const USERNAME_VAR: &str = "USERNAME";
pub const PASSWORD_VAR: &str = "PASSWORD";
pub const API_URL_VAR: &str = "API_URL";
pub const WEBSOCKET_VAR: &str = "WEBSOCKET";
