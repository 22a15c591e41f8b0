//! REST API client for the Burrow tunnel-provisioning service
//!
//! The client creates, lists, queries, and terminates tunnels, and
//! reports client-side status back to the service. Every operation
//! funnels through one execution core that builds authenticated
//! requests, wraps each failure into the unified [`ClientError`] shape,
//! computes a retryability verdict for it, and sanitizes URLs before
//! they can reach an error message or a log line.
//!
//! The core classifies retryability but never retries; callers that want
//! retries loop on [`ClientError::retryable`] themselves.
//!
//! # Example
//!
//! ```no_run
//! use burrow_rest::{Client, ClientOptions, Protocol};
//!
//! # async fn example() -> burrow_rest::Result<()> {
//! let client = Client::new(
//!     "https://api.burrow.example/rest/v1",
//!     ClientOptions {
//!         user: "alice".into(),
//!         password: "api-key".into(),
//!         ..Default::default()
//!     },
//! )?;
//!
//! for id in client.list_tunnels(Protocol::Relay).await? {
//!     println!("tunnel: {id}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod http;
pub mod region;
pub mod types;

mod tunnels;
mod vpn;

// Re-export the public surface for convenience
pub use client::{Client, ClientOptions};
pub use http::{
    compose_url, sanitize_raw_url, sanitize_url, BoxError, ClientError, Codec, DefaultTransport,
    Fault, JsonCodec, Method, Result, RetryPolicy, StatusCode, Transport,
};
pub use region::{Region, RegionMismatchError};
pub use types::{
    ClientStatusAck, ClientStatusRequest, CreateTunnelRequest, DownloadInfo, DownloadsByPlatform,
    Memory, Messages, Metadata, Protocol, ServiceConfiguration, TunnelState,
    TunnelStateWithMessages, Updates, UpdatesQuery, Versions,
};

/// Library version, reported in the default user-agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
