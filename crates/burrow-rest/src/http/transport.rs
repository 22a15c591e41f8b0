//! The round-tripper boundary
//!
//! The execution core does not talk to the network directly; it hands a
//! built request to a [`Transport`]. The default implementation is a
//! bounded reqwest client. Embedders inject their own to add
//! instrumentation, routing, or a fake server in tests.

use std::time::Duration;

use async_trait::async_trait;

/// Boxed error type crossing the transport and codec boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Overall timeout applied by the default transport. Per-call deadlines
/// have to be shorter than this to take effect.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Idle connections the default transport keeps per host.
const MAX_IDLE_CONNS_PER_HOST: usize = 100;

/// How long the default transport keeps an idle connection around.
const IDLE_CONN_TIMEOUT: Duration = Duration::from_secs(90);

/// Sends a built request and returns a response or a transport error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, BoxError>;
}

/// Default transport backed by a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    client: reqwest::Client,
}

impl DefaultTransport {
    /// Wrap an already-configured reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the bounded default client: a fixed overall timeout and a
    /// capped idle pool, never unlimited.
    pub(crate) fn default_client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_CONNS_PER_HOST)
            .pool_idle_timeout(IDLE_CONN_TIMEOUT)
            .build()
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    async fn round_trip(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, BoxError> {
        self.client.execute(request).await.map_err(Into::into)
    }
}
