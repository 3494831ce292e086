//! Authorization endpoint calls
//!
//! Handles the three session endpoints:
//! 1. Login (identifier + secret → token pair and user profile)
//! 2. Refresh (refresh token → new access token, optionally a rotated refresh token)
//! 3. Logout (best-effort remote invalidation of the access token)
//!
//! These calls never go through the authenticated request pipeline, so a
//! refresh can never trigger a nested refresh.
//!
//! Backends disagree on where the tokens live in a response body. Some
//! return `{"access": ...}` at the top level, others nest it under `data`
//! or `tokens`, and field names vary between `access`, `access_token` and
//! `accessToken`. `TokenResponse::from_value` normalizes all of these once,
//! here, so nothing downstream special-cases a response shape.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::secret::Token;

const ACCESS_FIELDS: &[&str] = &["access", "access_token", "accessToken", "token"];
const REFRESH_FIELDS: &[&str] = &["refresh", "refresh_token", "refreshToken"];
const NESTED_FIELDS: &[&str] = &["data", "tokens", "token"];

/// Normalized body of a login or refresh response.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access: Token,
    /// Present when the server issued (or rotated) a refresh token
    pub refresh: Option<Token>,
    /// User profile, only returned by login
    pub user: Option<Value>,
}

impl TokenResponse {
    /// Extract tokens from a response body, looking at the top level first
    /// and then one level down under `data`, `tokens` or `token`.
    pub fn from_value(body: &Value) -> Result<Self> {
        let access = find_str(body, ACCESS_FIELDS)
            .ok_or_else(|| Error::InvalidResponse("response has no access token".into()))?;
        let refresh = find_str(body, REFRESH_FIELDS);
        let user = find_value(body, "user").cloned();

        Ok(Self {
            access: Token::new(access),
            refresh: refresh.map(Token::new),
            user,
        })
    }
}

/// Candidate objects to search: the body itself, then nested objects.
fn scopes(body: &Value) -> impl Iterator<Item = &Value> {
    std::iter::once(body).chain(
        NESTED_FIELDS
            .iter()
            .filter_map(|field| body.get(field))
            .filter(|v| v.is_object()),
    )
}

fn find_str<'a>(body: &'a Value, fields: &[&str]) -> Option<&'a str> {
    scopes(body).find_map(|scope| {
        fields
            .iter()
            .filter_map(|field| scope.get(field).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    })
}

fn find_value<'a>(body: &'a Value, field: &str) -> Option<&'a Value> {
    scopes(body).find_map(|scope| scope.get(field).filter(|v| !v.is_null()))
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Exchange an identifier and secret for a token pair.
pub async fn login(
    client: &reqwest::Client,
    url: &str,
    identifier: &str,
    secret: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(url)
        .json(&LoginRequest { identifier, secret })
        .send()
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    read_token_response(response, "login").await
}

/// Trade a refresh token for a new access token.
pub async fn refresh(client: &reqwest::Client, url: &str, refresh: &Token) -> Result<TokenResponse> {
    let response = client
        .post(url)
        .json(&RefreshRequest {
            refresh: refresh.expose(),
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

    read_token_response(response, "refresh").await
}

/// Ask the server to invalidate the session.
///
/// Any HTTP response counts as success; only a network failure is an error.
pub async fn logout(client: &reqwest::Client, url: &str, access: Option<&Token>) -> Result<()> {
    let mut request = client.post(url);
    if let Some(access) = access {
        request = request.header(reqwest::header::AUTHORIZATION, access.bearer());
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

    debug!(status = response.status().as_u16(), "logout endpoint responded");
    Ok(())
}

async fn read_token_response(response: reqwest::Response, operation: &str) -> Result<TokenResponse> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 401/403 means the credentials themselves were refused
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::Rejected(format!(
                "{operation} rejected ({status}): {body}"
            )));
        }

        return Err(Error::Endpoint(format!(
            "{operation} returned {status}: {body}"
        )));
    }

    let body = response
        .json::<Value>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("{operation} body is not JSON: {e}")))?;

    TokenResponse::from_value(&body)
}
