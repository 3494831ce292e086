//! API client facade
//!
//! The public surface: login, logout, and generic requests. Login and logout
//! talk to the authorization endpoints directly; everything else goes through
//! the `RequestPipeline`.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use session_auth::{CredentialPair, CredentialStore, Storage, Token};
use tracing::{info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::pipeline::RequestPipeline;
use crate::refresh::RefreshCoordinator;
use crate::request::ApiRequest;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    /// User profile as returned by the server, if it sent one
    pub user: Option<serde_json::Value>,
    pub access: Token,
}

/// Authenticated API client.
///
/// Owns its own refresh coordinator, so independent clients (separate
/// accounts, separate key names) never block on each other's refreshes.
pub struct ApiClient {
    config: ClientConfig,
    http_client: reqwest::Client,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    pipeline: RequestPipeline,
}

impl ApiClient {
    /// Build a client with its own `reqwest::Client` using the configured timeout.
    pub fn new(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(config, storage, http_client)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        config: ClientConfig,
        storage: Arc<dyn Storage>,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(CredentialStore::new(storage, config.storage.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            http_client.clone(),
            config.endpoint_url(&config.endpoints.refresh),
            config.refresh_wait_timeout(),
        ));
        let pipeline = RequestPipeline::new(
            http_client.clone(),
            config.base_url.clone(),
            store.clone(),
            coordinator.clone(),
        );

        Ok(Self {
            config,
            http_client,
            store,
            coordinator,
            pipeline,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle to the credential store.
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Log in and persist the issued credentials.
    ///
    /// Skips the credential-attach step; there is no token yet.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session> {
        let url = self.config.endpoint_url(&self.config.endpoints.login);
        let response = session_auth::login(&self.http_client, &url, identifier, secret)
            .await
            .map_err(|e| match e {
                session_auth::Error::Http(msg) => Error::Transport(msg),
                other => Error::Auth(other.to_string()),
            })?;

        self.store
            .store_pair(&CredentialPair {
                access: response.access.clone(),
                refresh: response.refresh.clone(),
            })
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        match &response.user {
            Some(user) => {
                if let Err(e) = self.store.store_user(user).await {
                    warn!(error = %e, "failed to cache user profile");
                }
            }
            None => self.store.delete(&self.store.keys().user_key).await,
        }

        info!(has_refresh = response.refresh.is_some(), "logged in");
        Ok(Session {
            user: response.user,
            access: response.access,
        })
    }

    /// Log out. The remote call is best-effort; local credentials are always cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let url = self.config.endpoint_url(&self.config.endpoints.logout);
        let access = self.store.access().await;
        if let Err(e) = session_auth::logout(&self.http_client, &url, access.as_ref()).await {
            warn!(error = %e, "remote logout failed, clearing local session anyway");
        }
        self.store.clear().await;
        info!("logged out");
    }

    /// Send a request through the authenticated pipeline.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    pub async fn request(&self, request: ApiRequest) -> Result<reqwest::Response> {
        self.pipeline.execute(&request).await
    }

    /// Send a request and decode a 2xx JSON body.
    ///
    /// Other statuses become `Error::Status`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.request(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                Error::Decode("204 No Content, but response type needs a body".into())
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// `GET path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Whether an access token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.store.access().await.is_some()
    }

    /// User profile cached by the last login.
    pub async fn current_user(&self) -> Option<serde_json::Value> {
        self.store.user().await
    }

    /// Force a refresh (or join the one in flight).
    pub async fn obtain_fresh_credential(&self) -> Result<Token> {
        self.coordinator.obtain_fresh_credential().await
    }
}
