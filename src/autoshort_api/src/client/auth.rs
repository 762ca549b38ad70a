use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::{
    client::{error::ClientError, AuthState, AutoShortClient},
    constants::{TOKEN_PATH, USER_PROFILE_PATH},
    session::Session,
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    id_accounts: Vec<Value>,
}

impl AutoShortClient {
    /// Log in with the configured credentials.
    ///
    /// Exchanges the credentials for a bearer token, then resolves the account id with it.
    /// On success the session is appended to the session store (if any) and quote calls are
    /// released; on failure waiting quote calls fail with the login error.
    ///
    /// # Errors
    ///
    /// [`ClientError::Auth`] when the token endpoint answers with a 4xx status, transport and
    /// decoding errors as they are.
    pub async fn login(&self) -> Result<Session, ClientError> {
        match self.authenticate().await {
            Ok(session) => {
                if let Some(store) = &self.inner.store {
                    if let Err(e) = store.append(session.clone()) {
                        warn!(error = %e, "Could not persist session");
                    }
                }
                self.publish(AuthState::Ready(session.clone()));
                Ok(session)
            }
            Err(e) => {
                self.publish(AuthState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn authenticate(&self) -> Result<Session, ClientError> {
        let verbose = self.inner.config.verbose;
        let username = self.credentials().username();
        progress!(
            verbose,
            "Starting login process with credentials: {}:{}",
            username,
            username.masked()
        );

        let access_token = self.request_token().await?;

        progress!(verbose, "Getting account information");
        let id_account = self.request_account_id(&access_token).await?;
        progress!(verbose, "Account id: {}", id_account);

        Ok(Session::new(
            username.as_str(),
            access_token,
            id_account,
            Utc::now(),
        ))
    }

    async fn request_token(&self) -> Result<String, ClientError> {
        let credentials = self.credentials();
        let url = credentials.api_url().join(TOKEN_PATH);

        let response = self
            .inner
            .http
            .post(&url)
            .query(&[("grant_type", "password")])
            .json(&json!({
                "email": credentials.username().as_str(),
                "password": credentials.password().as_ref(),
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() {
            return Err(ClientError::Auth {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: compact_body(&body),
            });
        }
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }
        progress!(self.inner.config.verbose, "Login success: {}", status.as_u16());

        let token: TokenResponse = serde_json::from_str(&body)?;
        if token.access_token.is_empty() {
            return Err(ClientError::MissingToken);
        }
        Ok(token.access_token)
    }

    async fn request_account_id(&self, access_token: &str) -> Result<String, ClientError> {
        let url = self.credentials().api_url().join(USER_PROFILE_PATH);

        let response = self
            .inner
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let profile: UserProfile = serde_json::from_str(&body)?;
        first_account_id(&profile.id_accounts).ok_or(ClientError::NoAccount)
    }
}

/// The first listed account, whatever the number of accounts.
// TODO: pick the account by id once the profile endpoint documents which one is the primary
fn first_account_id(ids: &[Value]) -> Option<String> {
    match ids.first()? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Compact JSON for a JSON body, the raw text otherwise.
fn compact_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .map(|value| value.to_string())
        .unwrap_or_else(|_| body.to_string())
}
