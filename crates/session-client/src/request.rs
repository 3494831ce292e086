//! Request description
//!
//! `ApiRequest` is a plain value rather than a `reqwest::RequestBuilder` so the
//! pipeline can build the exact same request twice: once with the stored
//! token, once more with the refreshed one.

use std::str::FromStr;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use serde::Serialize;
use session_auth::Token;
use tracing::warn;

use crate::config::join_url;
use crate::error::{Error, Result};

/// One logical API request, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    anonymous: bool,
    wait_timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            anonymous: false,
            wait_timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body. Fails if `body` can't be serialized.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::InvalidRequest(format!("failed to serialize body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Send without a bearer token. Anonymous requests never trigger a refresh.
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Bound how long this request waits on another caller's refresh.
    pub fn wait_timeout(mut self, limit: Duration) -> Self {
        self.wait_timeout = Some(limit);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn refresh_wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    /// Build a sendable request, attaching `token` as the bearer credential.
    ///
    /// A caller-supplied `Authorization` header is dropped on authenticated
    /// requests; the pipeline owns that header.
    pub(crate) fn build(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        token: Option<&Token>,
    ) -> Result<reqwest::RequestBuilder> {
        let mut url = reqwest::Url::parse(&join_url(base_url, &self.path))
            .map_err(|e| Error::InvalidRequest(format!("invalid URL for {}: {e}", self.path)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_str(name)
                .map_err(|e| Error::InvalidRequest(format!("invalid header name {name}: {e}")))?;
            if name == AUTHORIZATION && !self.anonymous {
                warn!(path = %self.path, "refusing to overwrite managed authorization header");
                continue;
            }
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidRequest(format!("invalid header value for {name}: {e}")))?;
            headers.insert(name, value);
        }

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&token.bearer())
                .map_err(|e| Error::InvalidRequest(format!("invalid token value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = client.request(self.method.clone(), url).headers(headers);
        if let Some(body) = &self.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}
