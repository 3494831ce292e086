//! Session CLI
//!
//! Command-line front end for the authenticated API client:
//! 1. Loads `[client]` and `[session]` config from TOML
//! 2. Opens the credential file
//! 3. Runs one command (login, logout, whoami, refresh, or a raw request)
//!
//! Token refresh on 401 happens transparently inside the client.

mod config;
mod error;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use reqwest::Method;
use session_auth::FileStorage;
use session_client::{ApiClient, ApiRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const USAGE: &str = "usage: session-cli [--config PATH] <command>

commands:
  login [IDENTIFIER]     log in (secret from SESSION_SECRET or secret_file)
  logout                 invalidate the session and clear stored credentials
  whoami                 print the cached user profile
  refresh                force a credential refresh
  get PATH               GET an API path
  delete PATH            DELETE an API path
  post PATH JSON         POST a JSON body
  put PATH JSON          PUT a JSON body";

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Invocation {
    config_path: Option<String>,
    command: Command,
}

#[derive(Debug, PartialEq)]
enum Command {
    Login { identifier: Option<String> },
    Logout,
    WhoAmI,
    Refresh,
    Request {
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
    },
}

/// Simple `--config` flag + positional command parsing.
fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config requires a path")?;
            config_path = Some(path.clone());
        } else {
            positional.push(arg.as_str());
        }
    }

    let command = match positional.as_slice() {
        ["login"] => Command::Login { identifier: None },
        ["login", identifier] => Command::Login {
            identifier: Some((*identifier).to_string()),
        },
        ["logout"] => Command::Logout,
        ["whoami"] => Command::WhoAmI,
        ["refresh"] => Command::Refresh,
        ["get", path] => request(Method::GET, path, None)?,
        ["delete", path] => request(Method::DELETE, path, None)?,
        ["post", path, body] => request(Method::POST, path, Some(body))?,
        ["put", path, body] => request(Method::PUT, path, Some(body))?,
        _ => bail!("{USAGE}"),
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

fn request(method: Method, path: &str, body: Option<&str>) -> Result<Command> {
    let body = body
        .map(serde_json::from_str)
        .transpose()
        .context("request body must be valid JSON")?;
    Ok(Command::Request {
        method,
        path: path.to_string(),
        body,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays pipeable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    let config_path = Config::resolve_path(invocation.config_path.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.client.base_url,
        credentials = %config.session.credentials_path.display(),
        "configuration loaded"
    );

    let storage = FileStorage::load(config.session.credentials_path.clone())
        .await
        .context("failed to open credential file")?;
    let client = ApiClient::new(config.client.clone(), Arc::new(storage))?;

    run(&client, &config, invocation.command).await
}

async fn run(client: &ApiClient, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Login { identifier } => {
            let identifier = identifier
                .or_else(|| config.session.identifier.clone())
                .context("no identifier given and none configured")?;
            let secret = config
                .session
                .secret
                .as_ref()
                .context("no secret: set SESSION_SECRET or secret_file")?;
            let session = client.login(&identifier, secret.expose()).await?;
            match session.user {
                Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
                None => println!("logged in"),
            }
        }
        Command::Logout => {
            client.logout().await;
            println!("logged out");
        }
        Command::WhoAmI => match client.current_user().await {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None if client.is_authenticated().await => println!("authenticated (no cached profile)"),
            None => bail!("not logged in"),
        },
        Command::Refresh => {
            client.obtain_fresh_credential().await?;
            println!("credentials refreshed");
        }
        Command::Request { method, path, body } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.json(&body)?;
            }
            let response = client.request(request).await?;
            let status = response.status();
            let text = response.text().await.context("failed to read response body")?;
            eprintln!("{status}");
            println!("{text}");
            if !status.is_success() {
                bail!("request failed with {status}");
            }
        }
    }
    Ok(())
}
