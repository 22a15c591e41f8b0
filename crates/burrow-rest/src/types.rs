//! Resource payload types for the tunnel-provisioning API
//!
//! These shapes are opaque to the execution core; it only streams them
//! through the codec boundary. Response types default every field they
//! can, since the service omits empty values.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::region::Region;

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Tunnel backend protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Multiplexed relay tunnels, the default backend.
    Relay,
    /// IPSec VPN proxies.
    Ipsec,
}

impl Protocol {
    /// Wire name used in `backend` query parameters and create payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Relay => "relay",
            Protocol::Ipsec => "ipsec",
        }
    }

    /// URL path segment serving this backend's resources.
    pub(crate) fn path(&self) -> &'static str {
        match self {
            Protocol::Relay => "tunnels",
            Protocol::Ipsec => "vpns",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client host memory info, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, Available: {}, Used: {}, Free: {}",
            self.total, self.available, self.used, self.free
        )
    }
}

/// Client-side metadata attached to a tunnel at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub build: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub command_args: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_proxy: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
    #[serde(default)]
    pub git_version: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_cpu: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_memory: Option<u64>,
    #[serde(default)]
    pub nofile_limit: u64,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub release: String,
}

/// Request payload for provisioning a new tunnel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTunnelRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_domains: Vec<String>,
    #[serde(default)]
    pub domain_names: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_info: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fast_fail_regexps: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub no_proxy_caching: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no_ssl_bump_domains: Vec<String>,
    /// Backend protocol. Set by the VPN entry points; `None` selects the
    /// relay backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub shared_tunnel: bool,
    #[serde(default)]
    pub relay_port: u16,
    /// Identifier is always serialized; a `null` means an unnamed tunnel.
    #[serde(default)]
    pub tunnel_identifier: Option<String>,
    #[serde(default)]
    pub tunnel_pool: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vm_version: String,
}

/// Payload reporting the client's connection status for a tunnel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientStatusRequest {
    pub connected: bool,
    pub seconds_since_last_change: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Memory>,
}

/// Acknowledgement for a client status report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientStatusAck {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub result: bool,
}

/// Detailed tunnel information as returned by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelState {
    #[serde(default)]
    pub creation_time: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub shutdown_time: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_info: String,
    #[serde(default)]
    pub host: String,
    pub id: String,
    #[serde(default, rename = "ip_address", skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub shared_tunnel: bool,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shutdown_reason: String,
    #[serde(default)]
    pub status: String,
    /// `None` for unnamed tunnels; the service serializes those as null.
    #[serde(default)]
    pub tunnel_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_shutdown: Option<bool>,
}

/// Tunnel state plus the service messages that accompanied provisioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelStateWithMessages {
    #[serde(flatten)]
    pub state: TunnelState,
    #[serde(default, skip_serializing_if = "Messages::is_empty")]
    pub messages: Messages,
}

/// User-facing messages grouped by severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fatal: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warning: Vec<String>,
}

impl Messages {
    pub fn is_empty(&self) -> bool {
        self.fatal.is_empty() && self.info.is_empty() && self.warning.is_empty()
    }
}

/// Client configuration pushed by the service, intervals in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experimental: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub job_wait_timeout: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub handshake_timeout: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_missed_acks: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub client_status_interval: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub client_status_timeout: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<Region>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub server_status_interval: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub server_status_timeout: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub start_timeout: i64,
}

/// Response from the updates endpoint: messages for the user plus the
/// configuration the client should run with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Updates {
    #[serde(flatten)]
    pub messages: Messages,
    #[serde(default)]
    pub configuration: ServiceConfiguration,
}

/// Query parameters for [`Client::updates`](crate::Client::updates).
/// Empty fields are dropped from the request.
#[derive(Debug, Clone, Default)]
pub struct UpdatesQuery {
    pub client_host: String,
    pub client_version: String,
    pub configuration: String,
    pub region: String,
    pub tunnel_name: String,
    pub tunnel_pool: bool,
}

/// A downloadable client build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadInfo {
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub sha256: String,
}

/// Client downloads per platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadsByPlatform {
    #[serde(default)]
    pub linux: DownloadInfo,
    #[serde(default, rename = "linux-arm64", skip_serializing_if = "is_default_download")]
    pub linux_arm64: DownloadInfo,
    #[serde(default, skip_serializing_if = "is_default_download")]
    pub windows: DownloadInfo,
    #[serde(default)]
    pub macos: DownloadInfo,
}

fn is_default_download(download: &DownloadInfo) -> bool {
    download.download_url.is_empty() && download.sha256.is_empty()
}

/// Response from the versions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(rename = "latest_version")]
    pub latest: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default)]
    pub info_url: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warning: Vec<String>,
    #[serde(default)]
    pub downloads: DownloadsByPlatform,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub all_downloads: HashMap<String, DownloadsByPlatform>,
}
