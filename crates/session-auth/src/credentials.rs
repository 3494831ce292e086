//! Credential store for the session's token pair
//!
//! Sole owner of the persisted access token, refresh token and cached user
//! profile. Reads never fail the caller: a storage error is logged and the
//! entry is reported absent. Writes surface `Error::Storage`. Deletes are
//! idempotent and never surface errors.
//!
//! No lock is held across keys. A racing reader may see a new access token
//! next to the old refresh token for a moment; callers tolerate that.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_ACCESS_KEY, DEFAULT_REFRESH_KEY, DEFAULT_USER_KEY};
use crate::error::{Error, Result};
use crate::secret::Token;
use crate::storage::Storage;

/// Storage key names for the three persisted entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "default_access_key")]
    pub access_key: String,
    #[serde(default = "default_refresh_key")]
    pub refresh_key: String,
    #[serde(default = "default_user_key")]
    pub user_key: String,
}

fn default_access_key() -> String {
    DEFAULT_ACCESS_KEY.to_owned()
}

fn default_refresh_key() -> String {
    DEFAULT_REFRESH_KEY.to_owned()
}

fn default_user_key() -> String {
    DEFAULT_USER_KEY.to_owned()
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            access_key: default_access_key(),
            refresh_key: default_refresh_key(),
            user_key: default_user_key(),
        }
    }
}

/// Access token plus optional refresh token.
///
/// Without a refresh token, automatic renewal is disabled and an expired
/// access token is a hard failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: Token,
    pub refresh: Option<Token>,
}

/// Credential store over a pluggable `Storage` backend.
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    keys: StorageKeys,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>, keys: StorageKeys) -> Self {
        debug!(backend = storage.kind(), "credential store initialized");
        Self { storage, keys }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Read a raw entry. Storage failures are logged and treated as absent.
    pub async fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "credential read failed, treating as absent");
                None
            }
        }
    }

    /// Write a raw entry.
    pub async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set(key, value)
            .await
            .map_err(|e| Error::Storage(format!("writing {key}: {e}")))
    }

    /// Delete a raw entry. Deleting an absent key succeeds.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            warn!(key, error = %e, "credential delete failed");
        }
    }

    /// Current access token, if any.
    pub async fn access(&self) -> Option<Token> {
        self.read(&self.keys.access_key).await.map(Token::from)
    }

    /// Current refresh token, if any.
    pub async fn refresh(&self) -> Option<Token> {
        self.read(&self.keys.refresh_key).await.map(Token::from)
    }

    /// Snapshot of the pair. `None` if there is no access token.
    pub async fn pair(&self) -> Option<CredentialPair> {
        let access = self.access().await?;
        let refresh = self.refresh().await;
        Some(CredentialPair { access, refresh })
    }

    /// Cached user profile from the last login.
    pub async fn user(&self) -> Option<serde_json::Value> {
        let raw = self.read(&self.keys.user_key).await?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "cached user profile is not valid JSON, ignoring");
                None
            }
        }
    }

    /// Persist a freshly issued pair (login).
    ///
    /// A pair without a refresh token removes any refresh token left over
    /// from a previous session.
    pub async fn store_pair(&self, pair: &CredentialPair) -> Result<()> {
        self.write(&self.keys.access_key, pair.access.expose())
            .await?;
        match &pair.refresh {
            Some(refresh) => {
                self.write(&self.keys.refresh_key, refresh.expose())
                    .await?
            }
            None => self.delete(&self.keys.refresh_key).await,
        }
        debug!(has_refresh = pair.refresh.is_some(), "stored credential pair");
        Ok(())
    }

    /// Persist rotated tokens after a refresh.
    ///
    /// The refresh token is only replaced when the server issued a new one.
    pub async fn rotate(&self, access: &Token, refresh: Option<&Token>) -> Result<()> {
        self.write(&self.keys.access_key, access.expose()).await?;
        if let Some(refresh) = refresh {
            self.write(&self.keys.refresh_key, refresh.expose())
                .await?;
        }
        debug!(rotated_refresh = refresh.is_some(), "stored rotated credentials");
        Ok(())
    }

    /// Cache the user profile returned by login.
    pub async fn store_user(&self, user: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(user)
            .map_err(|e| Error::CredentialParse(format!("serializing user profile: {e}")))?;
        self.write(&self.keys.user_key, &json).await
    }

    /// Purge the access token, refresh token and cached user profile.
    pub async fn clear(&self) {
        self.delete(&self.keys.access_key).await;
        self.delete(&self.keys.refresh_key).await;
        self.delete(&self.keys.user_key).await;
        info!("cleared stored credentials");
    }
}
