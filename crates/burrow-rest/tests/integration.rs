//! End-to-end tests against a live burrow-mock server.
//!
//! Each test starts its own server on an ephemeral port, so tunnel state
//! and the outage toggle never leak between tests.

use std::time::Duration;

use burrow_rest::{
    Client, ClientOptions, CreateTunnelRequest, Fault, Memory, Method, Protocol, UpdatesQuery,
};
use serde_json::Value;

const CREATE_TIMEOUT: Duration = Duration::from_secs(10);

async fn start_mock() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        burrow_mock::run(listener).await.unwrap();
    });

    format!("http://{addr}")
}

fn client(base: &str) -> Client {
    Client::new(
        format!("{base}/rest/v1"),
        ClientOptions {
            user: "alice".to_string(),
            password: "test-key".to_string(),
            ..Default::default()
        },
    )
    .unwrap()
}

fn named_tunnel(identifier: &str) -> CreateTunnelRequest {
    CreateTunnelRequest {
        domain_names: vec!["app.internal".to_string()],
        tunnel_identifier: Some(identifier.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn tunnel_lifecycle() {
    let base = start_mock().await;
    let client = client(&base);

    // Provision.
    let provisioned = client
        .create_tunnel(&named_tunnel("ci-tunnel"), CREATE_TIMEOUT)
        .await
        .unwrap();
    assert!(provisioned.state.is_ready);
    assert_eq!(
        provisioned.state.tunnel_identifier.as_deref(),
        Some("ci-tunnel")
    );
    assert_eq!(provisioned.messages.info, vec!["tunnel provisioned"]);
    let id = provisioned.state.id.clone();

    // It shows up in listings.
    let ids = client.list_tunnels(Protocol::Relay).await.unwrap();
    assert_eq!(ids, vec![id.clone()]);

    // Point query.
    let state = client.tunnel_state(&id).await.unwrap();
    assert_eq!(state.status, "running");
    assert_eq!(state.owner, "alice");

    // Status report.
    let memory = Memory {
        total: 8,
        available: 4,
        used: 3,
        free: 1,
    };
    let ack = client
        .update_client_status(&id, true, Duration::from_secs(90), Some(memory))
        .await
        .unwrap();
    assert_eq!(ack.id, id);
    assert!(ack.result);

    // Terminate; the tunnel is gone afterwards.
    let jobs_running = client.shutdown_tunnel(&id, "sigterm", false).await.unwrap();
    assert_eq!(jobs_running, 0);

    let err = client.tunnel_state(&id).await.unwrap_err();
    assert_eq!(err.status_code, Some(404));
}

#[tokio::test]
async fn unnamed_tunnels_round_trip() {
    let base = start_mock().await;
    let client = client(&base);

    let provisioned = client
        .create_tunnel(&CreateTunnelRequest::default(), CREATE_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(provisioned.state.tunnel_identifier, None);
}

#[tokio::test]
async fn missing_tunnel_is_not_retryable() {
    let base = start_mock().await;
    let client = client(&base);

    let err = client.tunnel_state("tun-missing").await.unwrap_err();

    assert_eq!(err.status_code, Some(404));
    assert!(err.server_body.as_deref().unwrap().contains("not found"));
    assert!(!err.retryable);
    assert_eq!(
        err.cause.as_ref().unwrap().downcast_ref::<Fault>(),
        Some(&Fault::RequestFailed)
    );
    assert!(err.url.ends_with("/rest/v1/alice/tunnels/tun-missing"));
    assert!(err.to_string().contains("404 (Not Found)"));
}

#[tokio::test]
async fn outage_is_retryable_with_empty_body() {
    let base = start_mock().await;
    let client = client(&base);

    client
        .execute_raw(
            Method::POST,
            &format!("{base}/outage/1"),
            None::<&()>,
            None,
        )
        .await
        .unwrap();

    let err = client.list_tunnel_states(Protocol::Relay).await.unwrap_err();

    assert_eq!(err.status_code, Some(503));
    assert_eq!(err.server_body, None);
    assert!(err.retryable);
    assert_eq!(err.short(), "503 (Service Unavailable)");
}

#[tokio::test]
async fn deadline_expiry_surfaces_as_request_timeout() {
    let base = start_mock().await;
    let client = client(&base);

    let err = client
        .execute::<(), Value>(
            Method::GET,
            &format!("{base}/slow"),
            None,
            Some(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code, Some(408));
    assert!(err.retryable);
    assert!(err.url.ends_with("/slow"));
}

#[tokio::test]
async fn shared_listings_group_by_user() {
    let base = start_mock().await;
    let client = client(&base);

    client
        .create_tunnel(&named_tunnel("shared-a"), CREATE_TIMEOUT)
        .await
        .unwrap();
    client
        .create_tunnel(&named_tunnel("shared-b"), CREATE_TIMEOUT)
        .await
        .unwrap();

    let grouped = client
        .list_shared_tunnel_states(Protocol::Relay)
        .await
        .unwrap();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped["alice"].len(), 2);

    let ids = client.list_shared_tunnels(Protocol::Relay).await.unwrap();
    assert_eq!(ids["alice"].len(), 2);
}

#[tokio::test]
async fn all_tunnels_respects_the_limit() {
    let base = start_mock().await;
    let client = client(&base);

    for identifier in ["t-1", "t-2", "t-3"] {
        client
            .create_tunnel(&named_tunnel(identifier), CREATE_TIMEOUT)
            .await
            .unwrap();
    }

    let all = client.list_all_tunnel_states(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let limited = client.list_all_tunnel_states(Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn vpn_proxies_use_the_ipsec_backend() {
    let base = start_mock().await;
    let client = client(&base);

    let provisioned = client
        .create_vpn_proxy(&named_tunnel("vpn-1"), CREATE_TIMEOUT)
        .await
        .unwrap();
    assert!(provisioned.state.is_ready);

    let jobs_running = client
        .shutdown_vpn_proxy(&provisioned.state.id, "sigterm", true)
        .await
        .unwrap();
    assert_eq!(jobs_running, 0);
}

#[tokio::test]
async fn owner_override_targets_the_other_user() {
    let base = start_mock().await;
    let client = Client::new(
        format!("{base}/rest/v1"),
        ClientOptions {
            user: "alice".to_string(),
            password: "test-key".to_string(),
            tunnel_owner: Some("bob".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let provisioned = client
        .create_tunnel(&named_tunnel("bobs-tunnel"), CREATE_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(provisioned.state.owner, "bob");

    let state = client.tunnel_state(&provisioned.state.id).await.unwrap();
    assert_eq!(state.owner, "bob");
}

#[tokio::test]
async fn updates_deliver_configuration_and_regions() {
    let base = start_mock().await;
    let client = client(&base);

    let updates = client
        .updates(&UpdatesQuery {
            client_host: "linux".to_string(),
            client_version: "2.4.0".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updates.messages.info, vec!["mock service"]);
    assert_eq!(updates.configuration.client_status_interval, 30);
    assert_eq!(updates.configuration.regions.len(), 2);
    assert_eq!(updates.configuration.regions[0].name, "eu-central");
}

#[tokio::test]
async fn updates_without_regions_are_an_error() {
    let base = start_mock().await;
    let client = client(&base);

    let err = client
        .updates(&UpdatesQuery {
            client_host: "linux".to_string(),
            client_version: "2.4.0".to_string(),
            region: "nowhere".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.status_code, Some(500));
    assert!(!err.retryable);
    assert_eq!(
        err.cause.as_ref().unwrap().downcast_ref::<Fault>(),
        Some(&Fault::MissingRegions)
    );
    // The query string never leaks into the error.
    assert!(!err.url.contains('?'));
}

#[tokio::test]
async fn versions_report_the_latest_build() {
    let base = start_mock().await;
    let client = client(&base);

    let versions = client.versions("linux", "2.4.0", false).await.unwrap();
    assert_eq!(versions.latest, "2.4.1");
    assert_eq!(versions.status, "UPGRADE");
    assert_eq!(versions.downloads.linux.sha256, "3f1c6f9a");
    assert!(versions.all_downloads.is_empty());

    let with_all = client.versions("linux", "2.4.1", true).await.unwrap();
    assert_eq!(with_all.status, "UPTODATE");
    assert!(with_all.all_downloads.contains_key("2.4.1"));
}

#[tokio::test]
async fn crash_reports_are_accepted() {
    let base = start_mock().await;
    let client = client(&base);

    client
        .report_crash("ci-tunnel", "panic: relay disconnected", "last 100 log lines")
        .await
        .unwrap();
}
