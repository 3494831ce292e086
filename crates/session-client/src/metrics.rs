//! Metric emission helpers
//!
//! - `session_requests_total` (counter): label `outcome`
//! - `session_refresh_total` (counter): label `outcome`
//! - `session_refresh_waiters_total` (counter): requests that waited on another caller's refresh
//!
//! The library never installs a recorder; without one these are no-ops.

/// Record the final outcome of a pipeline request.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("session_requests_total", "outcome" => outcome).increment(1);
}

/// Record the outcome of a refresh network call.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a caller that joined an in-flight refresh instead of starting one.
pub fn record_refresh_waiter() {
    metrics::counter!("session_refresh_waiters_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_request("success");
        record_refresh("denied");
        record_refresh_waiter();
    }
}
