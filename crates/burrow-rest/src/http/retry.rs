//! Retry classification
//!
//! The policy decides whether a failed request is safe to re-attempt; it
//! never loops itself. Callers that want retries build their own loop on
//! top of [`ClientError::retryable`](crate::ClientError).

use std::collections::BTreeSet;

use crate::http::error::ClientError;

/// Decides which failures are safe to retry.
///
/// A policy is fixed once the client is constructed; extending it at
/// runtime means building a new client. Classification by status code
/// and by message fragment are independent checks: either alone can mark
/// an error retryable, and neither can unmark one.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    status_codes: BTreeSet<u16>,
    message_fragments: Vec<String>,
}

impl Default for RetryPolicy {
    /// The usually-accepted retryable status codes, and no message
    /// fragments.
    fn default() -> Self {
        Self {
            status_codes: BTreeSet::from([408, 409, 429, 500, 502, 503, 504]),
            message_fragments: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Policy with no retryable statuses and no fragments.
    pub fn empty() -> Self {
        Self {
            status_codes: BTreeSet::new(),
            message_fragments: Vec::new(),
        }
    }

    /// Also treat `code` as retryable.
    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_codes.insert(code);
        self
    }

    /// Also treat errors whose rendered cause contains `fragment` as
    /// retryable, e.g. a transient DNS message.
    pub fn with_message_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.message_fragments.push(fragment.into());
        self
    }

    /// Whether `code` is in the retryable set.
    pub fn is_retryable_status(&self, code: u16) -> bool {
        self.status_codes.contains(&code)
    }

    /// Compute `error.retryable` from the cause text and the status code.
    ///
    /// Both checks always run. The fragment scan stops at its first hit,
    /// but the status check still follows; a hit in either sets the flag
    /// and nothing ever clears it.
    pub fn classify(&self, error: &mut ClientError) {
        if let Some(cause) = &error.cause {
            let rendered = format!("{cause:#}");
            for fragment in &self.message_fragments {
                if rendered.contains(fragment) {
                    error.retryable = true;
                    break;
                }
            }
        }

        if let Some(code) = error.status_code {
            if self.status_codes.contains(&code) {
                error.retryable = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_with_status(code: u16) -> ClientError {
        ClientError {
            status_code: Some(code),
            url: "https://api.example.com/tunnels".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_status_table() {
        let policy = RetryPolicy::default();

        for code in [408, 409, 429, 500, 502, 503, 504] {
            assert!(policy.is_retryable_status(code), "{code} should retry");
        }
        for code in [200, 400, 401, 403, 404, 418] {
            assert!(!policy.is_retryable_status(code), "{code} should not retry");
        }
    }

    #[test]
    fn classify_marks_retryable_statuses() {
        let policy = RetryPolicy::default();

        let mut err = error_with_status(503);
        policy.classify(&mut err);
        assert!(err.retryable);

        let mut err = error_with_status(404);
        policy.classify(&mut err);
        assert!(!err.retryable);
    }

    #[test]
    fn classify_without_status_or_cause_stays_not_retryable() {
        let policy = RetryPolicy::default();
        let mut err = ClientError::default();

        policy.classify(&mut err);

        assert!(!err.retryable);
    }

    #[test]
    fn classify_never_clears_the_flag() {
        let policy = RetryPolicy::default();
        let mut err = error_with_status(404);
        err.retryable = true;

        policy.classify(&mut err);

        assert!(err.retryable);
    }

    #[test]
    fn message_fragment_marks_transport_errors() {
        let policy = RetryPolicy::default().with_message_fragment("connection refused");

        let mut err = ClientError {
            cause: Some(anyhow::anyhow!("connect error: connection refused")),
            url: "https://api.example.com/tunnels".to_string(),
            ..Default::default()
        };
        policy.classify(&mut err);

        assert!(err.retryable);
        assert_eq!(err.status_code, None);
    }

    #[test]
    fn fragment_scan_inspects_the_whole_chain() {
        let policy = RetryPolicy::default().with_message_fragment("no such host");

        let inner = anyhow::anyhow!("lookup api.example.com: no such host");
        let mut err = ClientError {
            cause: Some(inner.context("request dispatch failed")),
            ..Default::default()
        };
        policy.classify(&mut err);

        assert!(err.retryable);
    }

    #[test]
    fn checks_are_independent() {
        // A fragment miss must not prevent the status check from firing.
        let policy = RetryPolicy::default().with_message_fragment("no such host");

        let mut err = ClientError {
            cause: Some(anyhow::anyhow!("HTTP request failed")),
            status_code: Some(502),
            ..Default::default()
        };
        policy.classify(&mut err);

        assert!(err.retryable);
    }

    #[test]
    fn empty_policy_retries_nothing() {
        let policy = RetryPolicy::empty();

        let mut err = error_with_status(503);
        policy.classify(&mut err);

        assert!(!err.retryable);
    }

    #[test]
    fn builder_extends_both_tables() {
        let policy = RetryPolicy::empty()
            .with_status_code(418)
            .with_message_fragment("flaky");

        assert!(policy.is_retryable_status(418));

        let mut err = ClientError {
            cause: Some(anyhow::anyhow!("flaky link")),
            ..Default::default()
        };
        policy.classify(&mut err);
        assert!(err.retryable);
    }
}
