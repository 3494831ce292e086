//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login secret is loaded from the SESSION_SECRET env var or
//! `secret_file`, never stored in the TOML directly.

use serde::Deserialize;
use session_auth::Token;
use session_client::ClientConfig;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    pub session: SessionConfig,
}

/// Local session settings
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the persisted credentials
    pub credentials_path: PathBuf,
    /// Default login identifier when none is given on the command line
    #[serde(default)]
    pub identifier: Option<String>,
    /// Path to a file containing the login secret (alternative to SESSION_SECRET)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub secret: Option<Token>,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret resolution order:
    /// 1. SESSION_SECRET env var
    /// 2. secret_file path from config
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        config
            .client
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        if let Ok(secret) = std::env::var("SESSION_SECRET") {
            config.session.secret = Some(Token::new(secret));
        } else if let Some(ref secret_file) = config.session.secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                Error::Config(format!(
                    "failed to read secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim();
            if !secret.is_empty() {
                config.session.secret = Some(Token::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("session-cli.toml")
    }
}
