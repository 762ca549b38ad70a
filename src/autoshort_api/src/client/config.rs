use std::time::Duration;

use crate::{
    constants::DEFAULT_LOGIN_TIMEOUT,
    types::{ApiUrl, ConfigError, Password, Username},
};

/// Login credentials and the API they apply to. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: Username,
    password: Password,
    api_url: ApiUrl,
}

impl Credentials {
    /// Validate the three required params, in declaration order.
    pub fn new(username: &str, password: &str, api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            username: Username::new(username)?,
            password: Password::new(password)?,
            api_url: ApiUrl::new(api_url)?,
        })
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Log login and quote progress at info level instead of debug.
    pub verbose: bool,
    /// Websocket endpoint used by [`crate::client::stream::StreamListener`].
    pub stream_endpoint: Option<String>,
    /// How long a quote call waits for the login to settle.
    pub login_timeout: Duration,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            verbose: false,
            stream_endpoint: None,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_stream_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.stream_endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_missing_fields() {
        assert_eq!(
            Credentials::new("", "pw", "https://api.broker.test"),
            Err(ConfigError::Missing("username"))
        );
        assert_eq!(
            Credentials::new("jane", "", "https://api.broker.test"),
            Err(ConfigError::Missing("password"))
        );
        assert_eq!(
            Credentials::new("jane", "pw", ""),
            Err(ConfigError::Missing("apiUrl"))
        );
    }

    #[test]
    fn test_credentials_strip_trailing_slash() {
        let credentials = Credentials::new("jane", "pw", "https://api.broker.test//").unwrap();
        assert_eq!(credentials.api_url().as_str(), "https://api.broker.test");
        assert_eq!(credentials.username().as_str(), "jane");
        assert_eq!(credentials.password().as_ref(), "pw");
    }

    #[test]
    fn test_config_defaults() {
        let credentials = Credentials::new("jane", "pw", "https://api.broker.test").unwrap();
        let config = ClientConfig::new(credentials)
            .with_stream_endpoint(Some("  ".to_string()));
        assert!(!config.verbose);
        assert_eq!(config.stream_endpoint, None);
        assert_eq!(config.login_timeout, DEFAULT_LOGIN_TIMEOUT);

        let config = config
            .with_verbose(true)
            .with_stream_endpoint(Some("wss://stream.broker.test".to_string()))
            .with_login_timeout(Duration::from_secs(5));
        assert!(config.verbose);
        assert_eq!(config.stream_endpoint.as_deref(), Some("wss://stream.broker.test"));
        assert_eq!(config.login_timeout, Duration::from_secs(5));
    }
}
