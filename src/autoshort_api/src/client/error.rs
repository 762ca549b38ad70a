use std::time::Duration;

use thiserror::Error;

use crate::types::ConfigError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The token endpoint rejected the credentials with a 4xx status.
    #[error("Status: {status} ({status_text}): {body}")]
    Auth {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Stream(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Unexpected response from {url} ({status}): {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Token response does not contain an access token")]
    MissingToken,
    #[error("Account profile does not list any account id")]
    NoAccount,
    #[error("Empty quote response for {0}")]
    EmptyQuote(String),
    #[error("Login did not complete within {0:?}")]
    LoginTimeout(Duration),
    #[error("Login failed: {0}")]
    LoginFailed(String),
    #[error("Client was shut down")]
    Cancelled,
    #[error("No stream endpoint configured")]
    NoStreamEndpoint,
    #[error("Session store error: {0}")]
    Store(#[from] std::io::Error),
}
