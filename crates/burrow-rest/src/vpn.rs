//! VPN proxy resource operations
//!
//! The VPN surface rides on the same endpoints as relay tunnels with the
//! IPSec backend selected, so these are one-line delegations.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::Client;
use crate::http::error::Result;
use crate::types::{CreateTunnelRequest, Protocol, TunnelState, TunnelStateWithMessages};

impl Client {
    /// Start a new proxy over VPN. The request's protocol is forced to
    /// IPSec.
    pub async fn create_vpn_proxy(
        &self,
        request: &CreateTunnelRequest,
        timeout: Duration,
    ) -> Result<TunnelStateWithMessages> {
        let mut request = request.clone();
        request.protocol = Some(Protocol::Ipsec);

        self.create(&request, Protocol::Ipsec, timeout).await
    }

    /// IDs of the owner's VPN proxies.
    pub async fn list_vpn_proxies(&self) -> Result<Vec<String>> {
        self.list_tunnels(Protocol::Ipsec).await
    }

    /// States of the owner's VPN proxies.
    pub async fn list_vpn_states(&self) -> Result<Vec<TunnelState>> {
        self.list_tunnel_states(Protocol::Ipsec).await
    }

    /// VPN proxy IDs per user for an org with shared proxies.
    pub async fn list_shared_vpns(&self) -> Result<HashMap<String, Vec<String>>> {
        self.list_shared_tunnels(Protocol::Ipsec).await
    }

    /// VPN proxy states per user for an org with shared proxies.
    pub async fn list_shared_vpn_states(&self) -> Result<HashMap<String, Vec<TunnelState>>> {
        self.list_shared_tunnel_states(Protocol::Ipsec).await
    }

    /// Terminate a VPN proxy.
    pub async fn shutdown_vpn_proxy(&self, id: &str, reason: &str, wait: bool) -> Result<u32> {
        self.shutdown(id, reason, wait, Protocol::Ipsec).await
    }
}
