/// Log at info level when the client is verbose, at debug level otherwise.
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod auth;
pub mod config;
pub mod error;
pub mod quote;
pub mod stream;

use std::{fmt, sync::Arc};

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use self::{
    config::{ClientConfig, Credentials},
    error::ClientError,
    stream::StreamListener,
};
use crate::{
    constants::USER_AGENT,
    session::{Session, SessionStore},
};

/// Where the client stands in its login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Pending,
    Ready(Session),
    /// Display of the error that ended the login.
    Failed(String),
}

impl AuthState {
    fn settled(&self) -> Option<Result<Session, ClientError>> {
        match self {
            AuthState::Pending => None,
            AuthState::Ready(session) => Some(Ok(session.clone())),
            AuthState::Failed(message) => Some(Err(ClientError::LoginFailed(message.clone()))),
        }
    }
}

/// Client for the trading API.
///
/// Cloning is cheap: clones share the HTTP client, the session store, the auth state and
/// the shutdown token.
#[derive(Clone)]
pub struct AutoShortClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    /// The client used to make requests to the trading API.
    http: reqwest::Client,
    /// Optional cache of previous sessions, consulted once at construction.
    store: Option<Arc<dyn SessionStore>>,
    auth: watch::Sender<AuthState>,
    /// Cancels the login task, pending quote calls and listeners built by this client.
    shutdown: CancellationToken,
}

impl AutoShortClient {
    /// Build the client and start authenticating in the background.
    ///
    /// A fresh session from `store` is reused as is; otherwise a login task is spawned, so this
    /// must be called from within a Tokio runtime. Quote calls can be issued right away, they
    /// wait for the login to settle.
    pub fn new(
        config: ClientConfig,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Result<Self, ClientError> {
        let client = Self::idle(config, store)?;
        client.start();
        Ok(client)
    }

    /// Build the client without authenticating. Call [`AutoShortClient::login`] to do so.
    pub fn idle(
        config: ClientConfig,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let (auth, _) = watch::channel(AuthState::Pending);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                store,
                auth,
                shutdown: CancellationToken::new(),
            }),
        })
    }

    fn start(&self) {
        let username = self.credentials().username().as_str();
        let cached = self
            .inner
            .store
            .as_ref()
            .and_then(|store| store.fresh(username, Utc::now()));

        if let Some(session) = cached {
            progress!(
                self.inner.config.verbose,
                account = %session.id_account,
                "Reusing session created on {}",
                session.date
            );
            self.publish(AuthState::Ready(session));
            return;
        }

        let client = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = client.inner.shutdown.cancelled() => {
                    debug!("Login cancelled");
                }
                result = client.login() => {
                    if let Err(e) = result {
                        error!(error = %e, "Login failed");
                    }
                }
            }
        });
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.config.credentials
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.auth.borrow().clone()
    }

    /// The active session, once the login has succeeded.
    pub fn session(&self) -> Option<Session> {
        match &*self.inner.auth.borrow() {
            AuthState::Ready(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Wait for the login to settle, bounded by the configured login timeout.
    pub async fn wait_until_authenticated(&self) -> Result<Session, ClientError> {
        let settled = self.inner.auth.borrow().settled();
        if let Some(result) = settled {
            return result;
        }

        let timeout = self.inner.config.login_timeout;
        let mut receiver = self.inner.auth.subscribe();
        let settled = async move {
            let state = receiver
                .wait_for(|state| *state != AuthState::Pending)
                .await
                .map_err(|_| ClientError::Cancelled)?;
            state.settled().unwrap_or(Err(ClientError::Cancelled))
        };

        tokio::select! {
            () = self.inner.shutdown.cancelled() => Err(ClientError::Cancelled),
            result = tokio::time::timeout(timeout, settled) => {
                result.unwrap_or(Err(ClientError::LoginTimeout(timeout)))
            }
        }
    }

    /// Listener for the configured stream endpoint, stopped by [`AutoShortClient::shutdown`].
    pub fn stream_listener(&self) -> Result<StreamListener, ClientError> {
        let endpoint = self
            .inner
            .config
            .stream_endpoint
            .as_deref()
            .ok_or(ClientError::NoStreamEndpoint)?;

        Ok(StreamListener::new(endpoint).with_cancellation(self.inner.shutdown.child_token()))
    }

    /// Cancel the login task, pending quote calls and listeners built by this client.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    fn publish(&self, state: AuthState) {
        self.inner.auth.send_replace(state);
    }
}

impl fmt::Debug for AutoShortClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoShortClient")
            .field("config", &self.inner.config)
            .field("auth", &*self.inner.auth.borrow())
            .field("session_cache", &self.inner.store.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use super::config::{ClientConfig, Credentials};

    pub const USERNAME: &str = "jane@doe.com";
    pub const PASSWORD: &str = "hunter2";

    pub fn test_config(api_url: &str) -> ClientConfig {
        ClientConfig::new(Credentials::new(USERNAME, PASSWORD, api_url).unwrap())
            .with_login_timeout(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::testing::{test_config, USERNAME};
    use super::*;
    use crate::{
        client::quote::QuoteRequest,
        session::{JsonFileSessionStore, Session},
    };

    async fn mount_login(server: &MockServer, token: &str, account: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "token_type": "bearer",
                "expires_in": 3600,
            })))
            .expect(times)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .and(header("Authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_accounts": [account],
            })))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_debug_hides_secrets() {
        let client = AutoShortClient::idle(test_config("https://api.broker.test"), None).unwrap();
        client.publish(AuthState::Ready(Session::new(
            USERNAME,
            "tok1",
            "acc1",
            Utc::now(),
        )));

        let debug = format!("{client:?}");
        assert!(debug.starts_with("AutoShortClient"), "{debug}");
        assert!(debug.contains("acc1"), "{debug}");
        assert!(!debug.contains(super::testing::PASSWORD), "{debug}");
    }

    #[tokio::test]
    async fn test_quote_waits_for_login() {
        let server = MockServer::start().await;
        mount_login(&server, "tok1", "acc1", 1).await;

        Mock::given(method("GET"))
            .and(path("/api/v1/markets/tickers/YPFD"))
            .and(query_param("segment", "C"))
            .and(header("X-Account-Id", "acc1"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "instrument_code": "YPFD",
                "currency": "ARS",
                "bids": [{"price": 30.5, "size": 10}, {"price": 29.0, "size": 5}],
                "asks": [{"price": 32.0, "size": 1}, {"price": 31.0, "size": 2}],
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = AutoShortClient::new(test_config(&server.uri()), None).unwrap();
        let quote = client
            .get_quote(&QuoteRequest::new("YPFD").unwrap())
            .await
            .unwrap();

        assert_eq!(quote.instrument_code.as_deref(), Some("YPFD"));
        let bids: Vec<f64> = quote.bids.iter().map(|l| l.price).collect();
        let asks: Vec<f64> = quote.asks.iter().map(|l| l.price).collect();
        assert_eq!(bids, vec![29.0, 30.5]);
        assert_eq!(asks, vec![31.0, 32.0]);

        let session = client.session().unwrap();
        assert_eq!(session.username, USERNAME);
        assert_eq!(session.access_token, "tok1");
        assert_eq!(session.id_account, "acc1");
    }

    #[tokio::test]
    async fn test_fresh_cached_session_skips_login() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-new", "acc-new", 0).await;

        Mock::given(method("GET"))
            .and(path("/api/v1/markets/tickers/GGAL"))
            .and(header("X-Account-Id", "acc-cached"))
            .and(header("Authorization", "Bearer tok-cached"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bids": [], "asks": []})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileSessionStore::open(dir.path().join("sessions.json")));
        store
            .append(Session::new(
                USERNAME,
                "tok-cached",
                "acc-cached",
                Utc::now() - chrono::Duration::minutes(30),
            ))
            .unwrap();

        let client = AutoShortClient::new(
            test_config(&server.uri()),
            Some(store.clone() as Arc<dyn SessionStore>),
        )
        .unwrap();
        assert!(matches!(client.auth_state(), AuthState::Ready(_)));

        client
            .get_quote(&QuoteRequest::new("GGAL").unwrap())
            .await
            .unwrap();
        assert_eq!(store.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_cached_session_logs_in_again() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-new", "acc-new", 1).await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let store = Arc::new(JsonFileSessionStore::open(&path));
        store
            .append(Session::new(
                USERNAME,
                "tok-old",
                "acc-old",
                Utc::now() - chrono::Duration::hours(3),
            ))
            .unwrap();

        let client = AutoShortClient::new(
            test_config(&server.uri()),
            Some(store.clone() as Arc<dyn SessionStore>),
        )
        .unwrap();
        let session = client.wait_until_authenticated().await.unwrap();
        assert_eq!(session.access_token, "tok-new");

        let reopened = JsonFileSessionStore::open(&path);
        assert_eq!(reopened.sessions().len(), 2);
        assert_eq!(reopened.load(USERNAME).unwrap().access_token, "tok-new");
    }

    #[tokio::test]
    async fn test_quote_fails_when_login_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let client = AutoShortClient::new(test_config(&server.uri()), None).unwrap();
        let err = client
            .get_quote(&QuoteRequest::new("YPFD").unwrap())
            .await
            .unwrap_err();

        match err {
            ClientError::LoginFailed(message) => {
                assert!(message.contains("400"), "{message}");
                assert!(message.contains(r#"{"error":"invalid_grant"}"#), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(client.auth_state(), AuthState::Failed(_)));
    }

    #[tokio::test]
    async fn test_quote_times_out_on_slow_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok1"}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let config = test_config(&server.uri()).with_login_timeout(Duration::from_millis(100));
        let client = AutoShortClient::new(config, None).unwrap();
        let err = client
            .get_quote(&QuoteRequest::new("YPFD").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::LoginTimeout(t) if t == Duration::from_millis(100)));
        assert_eq!(client.auth_state(), AuthState::Pending);
        client.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_waiting_quote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok1"}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let client = AutoShortClient::new(test_config(&server.uri()), None).unwrap();
        let waiting = {
            let client = client.clone();
            tokio::spawn(async move { client.wait_until_authenticated().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        client.shutdown();

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }

    #[tokio::test]
    async fn test_stream_listener_requires_endpoint() {
        let client = AutoShortClient::idle(test_config("https://api.broker.test"), None).unwrap();
        assert!(matches!(
            client.stream_listener(),
            Err(ClientError::NoStreamEndpoint)
        ));

        let config = test_config("https://api.broker.test")
            .with_stream_endpoint(Some("wss://stream.broker.test".to_string()));
        let client = AutoShortClient::idle(config, None).unwrap();
        assert_eq!(client.stream_listener().unwrap().endpoint(), "wss://stream.broker.test");
    }
}
