//! The unified client error
//!
//! Every failure the client can produce, whether it happened while
//! encoding a payload, talking to the network, or decoding a response,
//! is wrapped into the single [`ClientError`] shape. Callers branch on
//! the status code and the `retryable` flag without having to inspect
//! the cause chain.

use std::fmt;

use reqwest::StatusCode;

use crate::http::transport::BoxError;
use crate::http::url::sanitize_raw_url;

/// Convenience alias for results carrying a [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

/// Sentinel causes for failures that do not originate in another library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// The server answered with a status outside the 2xx range.
    #[error("HTTP request failed")]
    RequestFailed,

    /// A response payload was expected, but the body was empty.
    #[error("can't decode a response from an empty body")]
    EmptyResponseBody,

    /// An updates response arrived without region information.
    #[error(r#"missing "regions" information"#)]
    MissingRegions,
}

/// Error returned by every client operation.
///
/// `status_code` is `None` when no HTTP response was obtained at all.
/// `url` is stored sanitized and never carries a query string or
/// fragment. `retryable` is computed by
/// [`RetryPolicy::classify`](crate::RetryPolicy::classify) before the
/// error is returned and is not mutated afterwards.
#[derive(Debug, Default)]
pub struct ClientError {
    /// Underlying failure, if any.
    pub cause: Option<anyhow::Error>,
    /// Replaces the rendered message entirely when set.
    pub message: Option<String>,
    /// Whether a caller-side retry is considered safe.
    pub retryable: bool,
    /// Raw server payload accompanying a non-2xx response.
    pub server_body: Option<String>,
    /// HTTP status code, when a response (or a synthesized status) exists.
    pub status_code: Option<u16>,
    /// Sanitized URL of the failed request.
    pub url: String,
}

impl ClientError {
    /// Canonical reason phrase for `code`, e.g. `404` to `Not Found`.
    fn reason(code: u16) -> &'static str {
        StatusCode::from_u16(code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown")
    }

    /// Concise summary: `"<status> (<reason>)"`, or a reach-failure note
    /// when no status was ever obtained.
    pub fn short(&self) -> String {
        match self.status_code {
            Some(code) => format!("{} ({})", code, Self::reason(code)),
            None => format!("Failed to reach {}", sanitize_raw_url(&self.url)),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            return f.write_str(message);
        }

        write!(f, "URL {}", sanitize_raw_url(&self.url))?;

        if let Some(code) = self.status_code {
            write!(f, " - {} ({})", code, Self::reason(code))?;
        }

        if let Some(cause) = &self.cause {
            write!(f, " Error: {cause:#}")?;
        }

        if let Some(body) = &self.server_body {
            write!(f, ". Server response: {body}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| AsRef::<dyn std::error::Error>::as_ref(cause))
    }
}

/// Adapt a boxed boundary error into the `cause` slot without losing its
/// source chain.
pub(crate) fn from_boxed(err: BoxError) -> anyhow::Error {
    #[derive(Debug)]
    struct Boxed(BoxError);

    impl fmt::Display for Boxed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Display::fmt(&self.0, f)
        }
    }

    impl std::error::Error for Boxed {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.0.source()
        }
    }

    anyhow::Error::new(Boxed(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_status_and_cause_and_body() {
        let err = ClientError {
            cause: Some(Fault::RequestFailed.into()),
            server_body: Some(r#"{"error":"tunnel not found"}"#.to_string()),
            status_code: Some(404),
            url: "https://api.example.com/tunnels/tun-1".to_string(),
            ..Default::default()
        };

        assert_eq!(
            err.to_string(),
            "URL https://api.example.com/tunnels/tun-1 - 404 (Not Found) \
             Error: HTTP request failed. \
             Server response: {\"error\":\"tunnel not found\"}"
        );
    }

    #[test]
    fn display_without_status() {
        let err = ClientError {
            url: "https://api.example.com/tunnels".to_string(),
            ..Default::default()
        };

        assert_eq!(err.to_string(), "URL https://api.example.com/tunnels");
    }

    #[test]
    fn display_sanitizes_url() {
        let err = ClientError {
            status_code: Some(503),
            url: "https://api.example.com/tunnels?access_key=secret".to_string(),
            ..Default::default()
        };

        let rendered = err.to_string();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains('?'));
    }

    #[test]
    fn explicit_message_overrides_rendering() {
        let err = ClientError {
            message: Some("tunnel service unavailable".to_string()),
            status_code: Some(503),
            url: "https://api.example.com".to_string(),
            ..Default::default()
        };

        assert_eq!(err.to_string(), "tunnel service unavailable");
    }

    #[test]
    fn short_prefers_status() {
        let err = ClientError {
            status_code: Some(503),
            url: "https://api.example.com/tunnels".to_string(),
            ..Default::default()
        };

        assert_eq!(err.short(), "503 (Service Unavailable)");
    }

    #[test]
    fn short_falls_back_to_sanitized_url() {
        let err = ClientError {
            url: "https://api.example.com/tunnels?full=1".to_string(),
            ..Default::default()
        };

        assert_eq!(err.short(), "Failed to reach https://api.example.com/tunnels");
    }

    #[test]
    fn source_exposes_the_cause() {
        let err = ClientError {
            cause: Some(Fault::EmptyResponseBody.into()),
            ..Default::default()
        };

        let source = std::error::Error::source(&err).expect("cause is set");
        assert_eq!(
            source.to_string(),
            Fault::EmptyResponseBody.to_string()
        );
    }

    #[test]
    fn from_boxed_preserves_display_and_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let cause = from_boxed(io.into());

        assert!(format!("{cause:#}").contains("connection refused"));
    }
}
