//! Authenticated request pipeline
//!
//! Attaches the stored access token, sends, and classifies the response. The
//! first 401 a logical request sees is absorbed: the pipeline asks the
//! refresh coordinator for a fresh token and replays the request once. The
//! replayed response is returned as-is, even if it is another 401.
//!
//! The retry flag lives in a per-request `RequestContext`, so concurrent
//! requests never share retry state. Transport failures are returned
//! immediately; there is no generic network retry here.

use std::sync::Arc;

use session_auth::{CredentialStore, Token};
use tracing::{Instrument, debug, debug_span, warn};
use uuid::Uuid;

use crate::classify::{Classification, classify};
use crate::error::{Error, Result};
use crate::metrics;
use crate::refresh::RefreshCoordinator;
use crate::request::ApiRequest;

/// Per-logical-request state carried across the original send and the replay.
#[derive(Debug)]
struct RequestContext {
    id: Uuid,
    retried: bool,
    /// Anonymous requests never enter the refresh path
    refreshable: bool,
}

impl RequestContext {
    fn new(request: &ApiRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            retried: false,
            refreshable: !request.is_anonymous(),
        }
    }

    fn classify(&self, status: u16) -> Classification {
        classify(status, self.retried || !self.refreshable)
    }
}

pub struct RequestPipeline {
    http_client: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl RequestPipeline {
    pub fn new(
        http_client: reqwest::Client,
        base_url: String,
        store: Arc<CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            store,
            coordinator,
        }
    }

    /// Execute a request, refreshing and replaying once on token expiry.
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let ctx = RequestContext::new(request);
        let span = debug_span!(
            "request",
            request_id = %ctx.id.as_simple(),
            method = %request.method(),
            path = request.path(),
        );
        self.run(request, ctx).instrument(span).await
    }

    async fn run(&self, request: &ApiRequest, mut ctx: RequestContext) -> Result<reqwest::Response> {
        // Read before the token so a refresh finishing in between is noticed
        let generation = self.coordinator.generation();
        let mut token = if request.is_anonymous() {
            None
        } else {
            self.store.access().await
        };

        loop {
            let response = self.send(request, token.as_ref()).await?;
            let status = response.status().as_u16();

            match ctx.classify(status) {
                Classification::AuthExpired => {
                    ctx.retried = true;
                    debug!(status, "access token expired, obtaining fresh credential");
                    let fresh = self
                        .coordinator
                        .credential_after_expiry(generation, request.refresh_wait_timeout())
                        .await
                        .inspect_err(|e| {
                            warn!(error = %e, "could not obtain fresh credential");
                            metrics::record_request("refresh_denied");
                        })?;
                    token = Some(fresh);
                }
                class => {
                    debug!(
                        status,
                        outcome = class.label(),
                        replayed = ctx.retried,
                        "request complete"
                    );
                    metrics::record_request(if status < 300 { "success" } else { "status" });
                    return Ok(response);
                }
            }
        }
    }

    async fn send(&self, request: &ApiRequest, token: Option<&Token>) -> Result<reqwest::Response> {
        let builder = request.build(&self.http_client, &self.base_url, token)?;
        builder.send().await.map_err(|e| {
            metrics::record_request("transport_error");
            if e.is_timeout() {
                Error::Transport(format!("request timed out: {e}"))
            } else {
                Error::Transport(e.to_string())
            }
        })
    }
}
