//! HTTP plumbing for the Burrow REST client
//!
//! This module provides the pieces the execution core is built from:
//! - URL composition and sanitization
//! - The unified error shape and its sentinel causes
//! - Retry classification
//! - The injectable transport and codec boundaries

pub mod codec;
pub mod error;
pub mod retry;
pub mod transport;
pub mod url;

pub use codec::{Codec, JsonCodec};
pub use error::{ClientError, Fault, Result};
pub use retry::RetryPolicy;
pub use transport::{BoxError, DefaultTransport, Transport};
pub use url::{compose_url, sanitize_raw_url, sanitize_url};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
