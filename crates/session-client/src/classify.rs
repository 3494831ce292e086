//! Response classification for the request pipeline
//!
//! A 401 only means "token expired" the first time a logical request sees it.
//! After one replay, a 401 is an ordinary failure so a request can never
//! loop through refresh twice.

/// What the pipeline should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx, return to the caller
    Success,
    /// First 401 for this request, refresh and replay
    AuthExpired,
    /// Any other status, or a 401 after replay; return to the caller as-is
    Failed,
}

/// Classify a response status for a request that has or hasn't been replayed.
pub fn classify(status: u16, retried: bool) -> Classification {
    match status {
        200..=299 => Classification::Success,
        401 if !retried => Classification::AuthExpired,
        _ => Classification::Failed,
    }
}

impl Classification {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Success => "success",
            Classification::AuthExpired => "auth_expired",
            Classification::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert_eq!(classify(200, false), Classification::Success);
        assert_eq!(classify(204, false), Classification::Success);
        assert_eq!(classify(299, true), Classification::Success);
    }

    #[test]
    fn first_401_is_expiry() {
        assert_eq!(classify(401, false), Classification::AuthExpired);
    }

    #[test]
    fn second_401_is_failure() {
        assert_eq!(classify(401, true), Classification::Failed);
    }

    #[test]
    fn other_statuses_fail_without_refresh() {
        for status in [301, 400, 403, 404, 429, 500, 503] {
            assert_eq!(classify(status, false), Classification::Failed, "{status}");
        }
    }
}
