//! Single-flight credential refresh
//!
//! Collapses concurrent token expiries into one refresh call. The first caller
//! to find the coordinator idle flips the state to `Refreshing` and spawns the
//! refresh as a task owned by the coordinator. That caller and every caller
//! arriving while the refresh is in flight hold a ticket (a oneshot receiver)
//! and wait. When the task finishes, the state goes back to `Idle` and the
//! same outcome is sent to every ticket.
//!
//! Because the refresh runs in its own task, a caller that times out or is
//! cancelled only drops its own ticket. The refresh always runs to completion
//! and its result is persisted.
//!
//! All decisions (join, lead, or reuse a token issued since the caller last
//! looked) happen under one `std::sync::Mutex` critical section that never
//! spans an await.
//!
//! Outcomes:
//! - Success → rotated tokens persisted, new access token broadcast
//! - Denied (no refresh token, rejected, network error) → stored credentials
//!   purged, same `RefreshDenied` broadcast
//! - Task ended without an outcome (panic, runtime shutdown) → tickets
//!   resolved with `Abandoned`, state reset

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use session_auth::{CredentialStore, Token};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{Error, RefreshDenied, Result};
use crate::metrics;

type Outcome = std::result::Result<Token, RefreshDenied>;

/// Refresh phase. The ticket queue only exists while a refresh is in flight.
enum RefreshState {
    Idle,
    Refreshing { tickets: Vec<oneshot::Sender<Outcome>> },
}

struct CoordinatorState {
    phase: RefreshState,
    /// Number of successful refreshes so far
    generation: u64,
    /// Access token issued by the most recent refresh, cleared on denial
    last_issued: Option<Token>,
}

/// What the refresh task needs; shared between the coordinator and the task.
struct Inner {
    state: Mutex<CoordinatorState>,
    store: Arc<CredentialStore>,
    http_client: reqwest::Client,
    refresh_url: String,
}

/// Per-client refresh coordinator.
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
    wait_timeout: Option<Duration>,
}

impl RefreshCoordinator {
    /// `wait_timeout` bounds how long a caller waits for the outcome; the
    /// refresh itself always runs to completion.
    pub fn new(
        store: Arc<CredentialStore>,
        http_client: reqwest::Client,
        refresh_url: String,
        wait_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CoordinatorState {
                    phase: RefreshState::Idle,
                    generation: 0,
                    last_issued: None,
                }),
                store,
                http_client,
                refresh_url,
            }),
            wait_timeout,
        }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(
            self.inner.lock_state().phase,
            RefreshState::Refreshing { .. }
        )
    }

    /// Count of successful refreshes. Read it before reading the access token
    /// and pass it to `credential_after_expiry` when that token is rejected.
    pub fn generation(&self) -> u64 {
        self.inner.lock_state().generation
    }

    /// Get a fresh access token, joining the in-flight refresh if there is one.
    pub async fn obtain_fresh_credential(&self) -> Result<Token> {
        self.obtain_fresh_credential_within(self.wait_timeout).await
    }

    /// Like `obtain_fresh_credential`, with an explicit bound on waiting.
    pub async fn obtain_fresh_credential_within(&self, wait: Option<Duration>) -> Result<Token> {
        self.acquire(None, wait).await
    }

    /// Fresh token for a request whose token was rejected.
    ///
    /// `seen_generation` is the value of `generation()` taken before that
    /// token was read. If a refresh has succeeded since then, its token is
    /// returned without starting another refresh.
    pub async fn credential_after_expiry(
        &self,
        seen_generation: u64,
        wait: Option<Duration>,
    ) -> Result<Token> {
        self.acquire(Some(seen_generation), wait.or(self.wait_timeout))
            .await
    }

    async fn acquire(&self, seen_generation: Option<u64>, wait: Option<Duration>) -> Result<Token> {
        let (rx, lead) = {
            let mut state = self.inner.lock_state();
            if let (Some(seen), RefreshState::Idle) = (seen_generation, &state.phase) {
                if state.generation > seen {
                    if let Some(token) = &state.last_issued {
                        debug!("access token already refreshed by another request, reusing it");
                        return Ok(token.clone());
                    }
                }
            }

            let (tx, rx) = oneshot::channel();
            match &mut state.phase {
                RefreshState::Refreshing { tickets } => {
                    tickets.push(tx);
                    debug!(queued = tickets.len(), "refresh in flight, waiting on ticket");
                    (rx, false)
                }
                RefreshState::Idle => {
                    state.phase = RefreshState::Refreshing { tickets: vec![tx] };
                    (rx, true)
                }
            }
        };

        if lead {
            self.spawn_refresh();
        } else {
            metrics::record_refresh_waiter();
        }
        wait_on_ticket(rx, wait).await
    }

    fn spawn_refresh(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut guard = TaskGuard {
                inner: inner.clone(),
                finished: false,
            };
            let outcome = inner.run_refresh().await;
            guard.finished = true;
            inner.resolve(&outcome);
        });
    }
}

impl Inner {
    /// The refresh itself. Goes straight to the auth endpoint, never through
    /// the request pipeline.
    async fn run_refresh(&self) -> Outcome {
        let Some(refresh) = self.store.refresh().await else {
            warn!("token expired and no refresh token stored, purging session");
            self.store.clear().await;
            metrics::record_refresh("no_refresh_token");
            return Err(RefreshDenied::NoRefreshCredential);
        };

        debug!("refreshing access token");
        match session_auth::refresh(&self.http_client, &self.refresh_url, &refresh).await {
            Ok(response) => {
                if let Err(e) = self
                    .store
                    .rotate(&response.access, response.refresh.as_ref())
                    .await
                {
                    warn!(error = %e, "failed to persist refreshed token");
                }
                info!(
                    rotated_refresh = response.refresh.is_some(),
                    "access token refreshed"
                );
                metrics::record_refresh("success");
                Ok(response.access)
            }
            Err(e) => {
                warn!(error = %e, "refresh denied, purging session");
                self.store.clear().await;
                metrics::record_refresh("denied");
                Err(RefreshDenied::from(e))
            }
        }
    }

    /// Return to `Idle`, record the outcome and hand it to every ticket.
    fn resolve(&self, outcome: &Outcome) {
        let tickets = {
            let mut state = self.lock_state();
            match outcome {
                Ok(token) => {
                    state.generation += 1;
                    state.last_issued = Some(token.clone());
                }
                Err(_) => state.last_issued = None,
            }
            match std::mem::replace(&mut state.phase, RefreshState::Idle) {
                RefreshState::Refreshing { tickets } => tickets,
                RefreshState::Idle => Vec::new(),
            }
        };

        debug!(
            waiters = tickets.len(),
            success = outcome.is_ok(),
            "resolving refresh tickets"
        );
        for ticket in tickets {
            // Receiver gone means that caller timed out or was cancelled
            let _ = ticket.send(outcome.clone());
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn wait_on_ticket(rx: oneshot::Receiver<Outcome>, wait: Option<Duration>) -> Result<Token> {
    let received = match wait {
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(received) => received,
            Err(_) => {
                warn!(?limit, "gave up waiting for in-flight refresh");
                return Err(Error::Timeout(limit));
            }
        },
        None => rx.await,
    };

    match received {
        Ok(outcome) => outcome.map_err(Error::from),
        Err(_) => Err(RefreshDenied::Abandoned.into()),
    }
}

/// Releases queued callers if the refresh task ends without resolving them.
struct TaskGuard {
    inner: Arc<Inner>,
    finished: bool,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("refresh task ended before completion, releasing waiters");
            self.inner.resolve(&Err(RefreshDenied::Abandoned));
        }
    }
}
