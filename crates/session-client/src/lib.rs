//! Authenticated HTTP client with single-flight credential refresh
//!
//! Attaches the stored bearer token to outgoing requests, detects expiry from
//! 401 responses, and collapses any number of concurrent expiries into one
//! refresh call. Every request blocked on that refresh is replayed once with
//! the new token.
//!
//! Request lifecycle:
//! 1. `ApiClient::request()` hands an `ApiRequest` to the `RequestPipeline`
//! 2. Pipeline attaches the access token from `CredentialStore` and sends
//! 3. 2xx or other statuses are returned as-is
//! 4. First 401 → `RefreshCoordinator::obtain_fresh_credential()`
//! 5. Coordinator runs one refresh; concurrent callers wait on a ticket
//! 6. Pipeline replays the request once with the new token
//! 7. Refresh denied → credentials purged, `Error::RefreshDenied` surfaced

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod refresh;
pub mod request;

#[cfg(test)]
mod test_support;

pub use classify::{Classification, classify};
pub use client::{ApiClient, Session};
pub use config::{ClientConfig, EndpointPaths};
pub use error::{Error, RefreshDenied, Result};
pub use pipeline::RequestPipeline;
pub use refresh::RefreshCoordinator;
pub use request::ApiRequest;
