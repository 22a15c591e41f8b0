//! Tunnel resource operations
//!
//! Thin callers only: each method composes an endpoint URL and delegates
//! to the execution core. Anything that can fail comes back as a
//! classified [`ClientError`](crate::ClientError).

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::http::error::{ClientError, Fault, Result};
use crate::http::url::{compose_url, sanitize_raw_url};
use crate::types::{
    ClientStatusAck, ClientStatusRequest, CreateTunnelRequest, Memory, Protocol, TunnelState,
    TunnelStateWithMessages, Updates, UpdatesQuery, Versions,
};

/// Path under the owner's namespace serving tunnel metadata queries.
const INFO_PATH: &str = "tunnels/info";

impl Client {
    /// Compose an endpoint URL, folding composition failures into the
    /// unified error shape.
    pub(crate) fn endpoint(
        &self,
        base: &str,
        paths: &[&str],
        query: &[(&str, &[&str])],
    ) -> Result<String> {
        compose_url(base, paths, query).map_err(|err| ClientError {
            cause: Some(err.into()),
            status_code: Some(500),
            url: sanitize_raw_url(base),
            ..Default::default()
        })
    }

    /// Provision a new tunnel on the relay backend.
    pub async fn create_tunnel(
        &self,
        request: &CreateTunnelRequest,
        timeout: Duration,
    ) -> Result<TunnelStateWithMessages> {
        self.create(request, Protocol::Relay, timeout).await
    }

    pub(crate) async fn create(
        &self,
        request: &CreateTunnelRequest,
        protocol: Protocol,
        timeout: Duration,
    ) -> Result<TunnelStateWithMessages> {
        let url = self.endpoint(self.base_url(), &[self.owner(), protocol.path()], &[])?;
        debug!(
            "provisioning {protocol} tunnel for {} at {}",
            self.owner(),
            sanitize_raw_url(&url)
        );

        self.execute(Method::POST, &url, Some(request), Some(timeout))
            .await
    }

    /// IDs of the owner's tunnels on the given backend.
    pub async fn list_tunnels(&self, protocol: Protocol) -> Result<Vec<String>> {
        let states = self.list_states(protocol).await?;
        Ok(states.into_iter().map(|state| state.id).collect())
    }

    /// States of the owner's tunnels on the given backend.
    pub async fn list_tunnel_states(&self, protocol: Protocol) -> Result<Vec<TunnelState>> {
        self.list_states(protocol).await
    }

    /// Tunnel IDs per user for an org with shared tunnels.
    pub async fn list_shared_tunnels(
        &self,
        protocol: Protocol,
    ) -> Result<HashMap<String, Vec<String>>> {
        let shared = self.list_shared_states(protocol).await?;
        Ok(shared
            .into_iter()
            .map(|(user, states)| {
                (
                    user,
                    states.into_iter().map(|state| state.id).collect(),
                )
            })
            .collect())
    }

    /// Tunnel states per user for an org with shared tunnels.
    pub async fn list_shared_tunnel_states(
        &self,
        protocol: Protocol,
    ) -> Result<HashMap<String, Vec<TunnelState>>> {
        self.list_shared_states(protocol).await
    }

    /// All of the owner's tunnels, including already terminated ones.
    /// `limit` bounds the result when given.
    pub async fn list_all_tunnel_states(&self, limit: Option<u32>) -> Result<Vec<TunnelState>> {
        let limit_value = limit.map(|limit| limit.to_string()).unwrap_or_default();
        // An unset limit serializes to an empty value, which the composer
        // drops.
        let url = self.endpoint(
            self.base_url(),
            &[self.owner(), "all_tunnels"],
            &[("limit", &[limit_value.as_str()])],
        )?;

        let mut grouped: HashMap<String, Vec<TunnelState>> =
            self.execute(Method::GET, &url, None::<&()>, None).await?;
        Ok(grouped.remove("tunnels").unwrap_or_default())
    }

    pub(crate) async fn list_states(&self, protocol: Protocol) -> Result<Vec<TunnelState>> {
        let url = self.endpoint(
            self.base_url(),
            &[self.owner(), "tunnels"],
            &[("full", &["1"]), ("backend", &[protocol.as_str()])],
        )?;

        self.execute(Method::GET, &url, None::<&()>, None).await
    }

    pub(crate) async fn list_shared_states(
        &self,
        protocol: Protocol,
    ) -> Result<HashMap<String, Vec<TunnelState>>> {
        let url = self.endpoint(
            self.base_url(),
            &[self.owner(), "tunnels"],
            &[
                ("full", &["1"]),
                ("all", &["1"]),
                ("backend", &[protocol.as_str()]),
            ],
        )?;

        self.execute(Method::GET, &url, None::<&()>, None).await
    }

    /// Terminate a relay tunnel. `reason` could be "sigterm",
    /// "serverTimeout", and so on; `wait` asks the server to let running
    /// jobs finish first. Returns the number of jobs still running.
    pub async fn shutdown_tunnel(&self, id: &str, reason: &str, wait: bool) -> Result<u32> {
        self.shutdown(id, reason, wait, Protocol::Relay).await
    }

    pub(crate) async fn shutdown(
        &self,
        id: &str,
        reason: &str,
        wait: bool,
        protocol: Protocol,
    ) -> Result<u32> {
        let url = self.endpoint(
            self.base_url(),
            &[self.owner(), protocol.path(), id],
            &[
                ("reason", &[reason]),
                ("wait", &[if wait { "1" } else { "0" }]),
            ],
        )?;
        debug!("shutting down {protocol} tunnel {id}: {reason}");

        #[derive(Deserialize)]
        struct ShutdownResponse {
            jobs_running: u32,
        }

        let response: ShutdownResponse =
            self.execute(Method::DELETE, &url, None::<&()>, None).await?;
        Ok(response.jobs_running)
    }

    /// Information about tunnel `id`.
    pub async fn tunnel_state(&self, id: &str) -> Result<TunnelState> {
        let url = self.endpoint(self.base_url(), &[self.owner(), "tunnels", id], &[])?;

        self.execute(Method::GET, &url, None::<&()>, None).await
    }

    /// Report the client's connection status for tunnel `id`.
    pub async fn update_client_status(
        &self,
        id: &str,
        connected: bool,
        since_change: Duration,
        memory: Option<Memory>,
    ) -> Result<ClientStatusAck> {
        let url = self.endpoint(
            self.base_url(),
            &[self.username(), "tunnels", id, "connected"],
            &[],
        )?;

        let request = ClientStatusRequest {
            connected,
            seconds_since_last_change: since_change.as_secs() as i64,
            memory,
        };

        self.execute(Method::POST, &url, Some(&request), None).await
    }

    /// Tell the service the client crashed. The response body, if any, is
    /// discarded.
    pub async fn report_crash(&self, tunnel: &str, info: &str, logs: &str) -> Result<()> {
        #[derive(Serialize)]
        struct CrashReport<'a> {
            tunnel: &'a str,
            info: &'a str,
            logs: &'a str,
        }

        let url = self.endpoint(self.base_url(), &[self.username(), "errors"], &[])?;
        debug!("reporting crash for tunnel {tunnel}");

        self.execute_raw(Method::POST, &url, Some(&CrashReport { tunnel, info, logs }), None)
            .await?;
        Ok(())
    }

    /// Retrieve user messages and the client configuration the service
    /// wants this client to run with. A response without region
    /// information is an error.
    pub async fn updates(&self, query: &UpdatesQuery) -> Result<Updates> {
        let tunnel_pool = if query.tunnel_pool { "true" } else { "false" };
        let url = self.endpoint(
            self.base_url(),
            &[self.owner(), INFO_PATH, "updates"],
            &[
                ("client_host", &[query.client_host.as_str()]),
                ("client_version", &[query.client_version.as_str()]),
                ("configuration", &[query.configuration.as_str()]),
                ("region", &[query.region.as_str()]),
                ("tunnel_name", &[query.tunnel_name.as_str()]),
                ("tunnel_pool", &[tunnel_pool]),
            ],
        )?;

        let updates: Updates = self.execute(Method::GET, &url, None::<&()>, None).await?;

        if updates.configuration.regions.is_empty() {
            return Err(ClientError {
                cause: Some(Fault::MissingRegions.into()),
                status_code: Some(500),
                url: sanitize_raw_url(&url),
                ..Default::default()
            });
        }

        Ok(updates)
    }

    /// Retrieve client version information. Served from the global base
    /// URL when one is configured, since the answer is region-independent.
    pub async fn versions(&self, platform: &str, version: &str, all: bool) -> Result<Versions> {
        let base = self.global_base_url().unwrap_or(self.base_url());
        let url = self.endpoint(
            base,
            &["public", INFO_PATH, "versions"],
            &[
                ("client_version", &[version]),
                ("client_host", &[platform]),
                ("all", &[if all { "true" } else { "false" }]),
            ],
        )?;

        self.execute(Method::GET, &url, None::<&()>, None).await
    }
}
