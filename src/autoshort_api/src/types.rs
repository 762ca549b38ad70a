use std::{fmt, str::FromStr};

use derive_more::Into;
use regex::Regex;
use thiserror::Error;

lazy_static::lazy_static! {
    static ref INSTRUMENT_CODE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,31}$")
        .expect("Failed to compile instrument code regex");
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing param \"{0}\"")]
    Missing(&'static str),
    #[error("invalid api url \"{0}\": must be an absolute http(s) url")]
    ApiUrl(String),
    #[error("invalid instrument code: must be 1-32 characters (A-Z, a-z, 0-9, '.', '-', '_') starting with a letter or digit")]
    InstrumentCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Into)]
pub struct Username(String);
impl Username {
    pub fn new(s: &str) -> Result<Self, ConfigError> {
        let t = s.trim();
        if t.is_empty() {
            return Err(ConfigError::Missing("username"));
        }
        Ok(Self(t.into()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Username with every character replaced by `*`, for diagnostics.
    pub fn masked(&self) -> String {
        "*".repeat(self.0.chars().count())
    }
}
impl FromStr for Username {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);
impl Password {
    pub fn new(s: &str) -> Result<Self, ConfigError> {
        if s.is_empty() {
            return Err(ConfigError::Missing("password"));
        }
        Ok(Self(s.into()))
    }
}
impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

/// Base url of the trading API, without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Into)]
pub struct ApiUrl(String);
impl ApiUrl {
    pub fn new(s: &str) -> Result<Self, ConfigError> {
        let t = s.trim().trim_end_matches('/');
        if t.is_empty() {
            return Err(ConfigError::Missing("apiUrl"));
        }
        match reqwest::Url::parse(t) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self(t.into())),
            _ => Err(ConfigError::ApiUrl(t.into())),
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}
impl FromStr for ApiUrl {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl AsRef<str> for ApiUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Into)]
pub struct InstrumentCode(String);
impl InstrumentCode {
    pub fn new(s: &str) -> Result<Self, ConfigError> {
        let t = s.trim();
        if INSTRUMENT_CODE_REGEX.is_match(t) {
            Ok(Self(t.into()))
        } else {
            Err(ConfigError::InstrumentCode)
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl FromStr for InstrumentCode {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl AsRef<str> for InstrumentCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for InstrumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
