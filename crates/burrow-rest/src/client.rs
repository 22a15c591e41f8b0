//! The Burrow REST API client and its request execution core
//!
//! [`Client::execute`] is the single chokepoint every operation funnels
//! through: encode, build, decorate, transmit, status-check, decode.
//! Each failure is wrapped into [`ClientError`] with a sanitized URL,
//! classified for retryability, and returned. The core never logs and
//! never retries; looping on `retryable` is the caller's business.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;

use crate::http::codec::{Codec, JsonCodec};
use crate::http::error::{from_boxed, ClientError, Fault, Result};
use crate::http::retry::RetryPolicy;
use crate::http::transport::{BoxError, DefaultTransport, Transport};
use crate::http::url::{sanitize_raw_url, sanitize_url};

/// User-agent header sent when none is configured.
pub(crate) fn default_user_agent() -> String {
    format!("burrow-rest/{}", env!("CARGO_PKG_VERSION"))
}

/// Options used to initialize a [`Client`].
#[derive(Default)]
pub struct ClientOptions {
    /// REST API URL for region-independent queries.
    pub global_base_url: Option<String>,
    /// Headers added to each request. Names are lowercased; a
    /// `user-agent` entry overrides the library default.
    pub headers: HashMap<String, String>,
    /// API key used to authenticate requests.
    pub password: String,
    /// Name or ID of the user who is the subject of queries, when
    /// different from `user`.
    pub tunnel_owner: Option<String>,
    /// Name or ID of the user who executes requests.
    pub user: String,
    /// Deadline applied to every call that does not carry its own.
    pub request_timeout: Option<Duration>,
    /// Retry classification policy.
    pub retry: RetryPolicy,
    /// Round-tripper override. The bounded default client is used when
    /// absent.
    pub transport: Option<Arc<dyn Transport>>,
    /// Wire-format override. JSON is used when absent.
    pub codec: Option<Arc<dyn Codec>>,
}

/// The Burrow REST API client. It allows you to create, query, and
/// terminate tunnels, and to report client-side status to the service.
pub struct Client {
    base_url: String,
    global_base_url: Option<String>,
    headers: HashMap<String, String>,
    username: String,
    password: String,
    tunnel_owner: Option<String>,
    request_timeout: Option<Duration>,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    /// Used to construct outbound requests; the default transport shares
    /// its connection pool.
    http: reqwest::Client,
}

impl Client {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let base_url = base_url.into();

        let http = DefaultTransport::default_client().map_err(|err| ClientError {
            cause: Some(err.into()),
            status_code: Some(500),
            url: sanitize_raw_url(&base_url),
            ..Default::default()
        })?;

        let mut headers = HashMap::new();
        headers.insert("user-agent".to_string(), default_user_agent());
        for (name, value) in options.headers {
            headers.insert(name.to_lowercase(), value);
        }

        let transport = options
            .transport
            .unwrap_or_else(|| Arc::new(DefaultTransport::new(http.clone())));
        let codec = options.codec.unwrap_or_else(|| Arc::new(JsonCodec));

        Ok(Self {
            base_url,
            global_base_url: options.global_base_url,
            headers,
            username: options.user,
            password: options.password,
            tunnel_owner: options.tunnel_owner,
            request_timeout: options.request_timeout,
            retry: options.retry,
            transport,
            codec,
            http,
        })
    }

    /// REST API URL used for region-bound queries.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// REST API URL used for region-independent queries, when configured.
    pub fn global_base_url(&self) -> Option<&str> {
        self.global_base_url.as_deref()
    }

    /// The retry classification policy in effect.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The user whose tunnels are the subject of queries.
    pub(crate) fn owner(&self) -> &str {
        self.tunnel_owner.as_deref().unwrap_or(&self.username)
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    fn encode<T>(&self, payload: &T) -> std::result::Result<Vec<u8>, anyhow::Error>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload)?;
        self.codec.encode(&value).map_err(from_boxed)
    }

    fn decode<T>(&self, body: &[u8]) -> std::result::Result<T, anyhow::Error>
    where
        T: DeserializeOwned,
    {
        if body.is_empty() {
            return Err(anyhow::Error::new(Fault::EmptyResponseBody));
        }

        let value = self.codec.decode(body).map_err(from_boxed)?;
        serde_json::from_value(value).map_err(Into::into)
    }

    /// Execute `method` against `url` and decode the response into `Resp`.
    ///
    /// `request`, when given, is encoded as the request body. The
    /// deadline (explicit, or the configured default) bounds connection
    /// acquisition, request transmission, and the response-header read;
    /// when it expires the call fails with status 408. Every failure is
    /// returned as a classified [`ClientError`].
    pub async fn execute<Req, Resp>(
        &self,
        method: Method,
        url: &str,
        request: Option<&Req>,
        deadline: Option<Duration>,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = self.execute_raw(method, url, request, deadline).await?;

        self.decode(&body).map_err(|err| ClientError {
            cause: Some(err),
            status_code: Some(500),
            url: sanitize_raw_url(url),
            ..Default::default()
        })
    }

    /// Like [`Client::execute`], but hands back the raw success body
    /// without decoding it.
    pub async fn execute_raw<Req>(
        &self,
        method: Method,
        url: &str,
        request: Option<&Req>,
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>>
    where
        Req: Serialize + ?Sized,
    {
        // Encode the request payload, if any. Serialization failures are
        // deterministic, so they skip classification and stay final.
        let payload = match request {
            Some(request) => Some(self.encode(request).map_err(|err| ClientError {
                cause: Some(err),
                status_code: Some(500),
                url: sanitize_raw_url(url),
                ..Default::default()
            })?),
            None => None,
        };

        let mut builder = self.http.request(method, url);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .basic_auth(&self.username, Some(&self.password));
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }

        let request = builder.build().map_err(|err| ClientError {
            cause: Some(err.into()),
            status_code: Some(500),
            url: sanitize_raw_url(url),
            ..Default::default()
        })?;
        let sanitized = sanitize_url(request.url());

        // Transmit. The deadline covers connection acquisition, request
        // transmission, and the response-header read.
        let outcome = match deadline.or(self.request_timeout) {
            Some(limit) => match timeout(limit, self.transport.round_trip(request)).await {
                Ok(outcome) => outcome,
                Err(elapsed) => Err(BoxError::from(elapsed)),
            },
            None => self.transport.round_trip(request).await,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                let mut failure = ClientError {
                    status_code: partial_status(err.as_ref()),
                    url: sanitized,
                    ..Default::default()
                };

                // A deadline expiry counts as a client-perceived timeout
                // even if the server had started responding.
                if is_deadline_exceeded(err.as_ref()) {
                    failure.status_code = Some(408);
                }

                failure.cause = Some(from_boxed(err));
                self.retry.classify(&mut failure);

                return Err(failure);
            }
        };

        // Only 2xx counts as success.
        let status = response.status();
        if !status.is_success() {
            // The server may have sent a reason, e.g. {"error":"xyz"};
            // try to capture it.
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    return Err(ClientError {
                        cause: Some(err.into()),
                        status_code: Some(500),
                        url: sanitized,
                        ..Default::default()
                    });
                }
            };

            let mut failure = ClientError {
                cause: Some(anyhow::Error::new(Fault::RequestFailed)),
                status_code: Some(status.as_u16()),
                server_body: (!body.is_empty()).then_some(body),
                url: sanitized,
                ..Default::default()
            };
            self.retry.classify(&mut failure);

            return Err(failure);
        }

        match response.bytes().await {
            Ok(body) => Ok(body.to_vec()),
            Err(err) => Err(ClientError {
                cause: Some(err.into()),
                status_code: Some(500),
                url: sanitized,
                ..Default::default()
            }),
        }
    }
}

/// True when anything in the chain is a deadline expiry: the per-call
/// deadline elapsing, or the transport reporting its own timeout.
fn is_deadline_exceeded(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            if err.is_timeout() {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Status reported alongside a transport failure, if the transport got
/// far enough to observe one.
fn partial_status(err: &(dyn std::error::Error + 'static)) -> Option<u16> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            if let Some(status) = err.status() {
                return Some(status.as_u16());
            }
        }
        current = err.source();
    }
    None
}
