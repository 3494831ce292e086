//! Client configuration
//!
//! Everything the client needs is supplied at construction. There is no
//! global configuration; two clients with different configs (e.g. two
//! accounts) never share state.

use std::time::Duration;

use serde::Deserialize;
use session_auth::{DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH, DEFAULT_REFRESH_PATH, StorageKeys};

use crate::error::{Error, Result};

/// Client settings, deserializable from a TOML table.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://api.example.com/v1`
    pub base_url: String,
    /// Per-request HTTP timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on how long a request waits for someone else's refresh.
    /// Unset means wait for the refresh to finish.
    #[serde(default)]
    pub refresh_wait_timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: EndpointPaths,
    #[serde(default)]
    pub storage: StorageKeys,
}

/// Authorization endpoint paths, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointPaths {
    #[serde(default = "default_login_path")]
    pub login: String,
    #[serde(default = "default_refresh_path")]
    pub refresh: String,
    #[serde(default = "default_logout_path")]
    pub logout: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_owned()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_owned()
}

fn default_logout_path() -> String {
    DEFAULT_LOGOUT_PATH.to_owned()
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            login: default_login_path(),
            refresh: default_refresh_path(),
            logout: default_logout_path(),
        }
    }
}

impl ClientConfig {
    /// Config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout(),
            refresh_wait_timeout_secs: None,
            endpoints: EndpointPaths::default(),
            storage: StorageKeys::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".into()));
        }

        if self.refresh_wait_timeout_secs == Some(0) {
            return Err(Error::Config(
                "refresh_wait_timeout_secs must be greater than 0 when set".into(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_wait_timeout(&self) -> Option<Duration> {
        self.refresh_wait_timeout_secs.map(Duration::from_secs)
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}
