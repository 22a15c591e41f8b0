//! In-memory emulation of the Burrow tunnel service
//!
//! Implements the slice of the REST API the client exercises, backed by a
//! shared in-memory map, plus two test hooks: an outage toggle that makes
//! every data route answer 503 with an empty body, and a `/slow` route
//! that stalls long enough to trip any reasonable client deadline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// A provisioned tunnel as the mock stores and serves it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tunnel {
    pub id: String,
    pub owner: String,
    pub status: String,
    pub is_ready: bool,
    pub creation_time: i64,
    pub tunnel_identifier: Option<String>,
    pub shared_tunnel: bool,
    pub host: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Shared service state.
#[derive(Default)]
pub struct ServiceState {
    tunnels: RwLock<HashMap<String, Tunnel>>,
    outage: AtomicBool,
    counter: AtomicU64,
}

type AppState = Arc<ServiceState>;

/// Build the service router with a fresh state.
pub fn app() -> Router {
    let state: AppState = Arc::new(ServiceState::default());

    Router::new()
        .route(
            "/rest/v1/{user}/tunnels",
            get(list_tunnels).post(create_tunnel),
        )
        .route("/rest/v1/{user}/vpns", post(create_tunnel))
        .route("/rest/v1/{user}/all_tunnels", get(list_all_tunnels))
        .route("/rest/v1/{user}/tunnels/info/updates", get(updates))
        .route(
            "/rest/v1/{user}/tunnels/{id}",
            get(tunnel_state).delete(shutdown_tunnel),
        )
        .route("/rest/v1/{user}/vpns/{id}", delete(shutdown_tunnel))
        .route("/rest/v1/{user}/tunnels/{id}/connected", post(client_status))
        .route("/rest/v1/{user}/errors", post(report_crash))
        .route("/rest/v1/public/tunnels/info/versions", get(versions))
        .route("/slow", get(slow))
        .route("/outage/{enabled}", post(set_outage))
        .with_state(state)
}

/// Serve the mock on `listener` until the process ends.
pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "tunnel not found"})),
    )
        .into_response()
}

fn outage(state: &ServiceState) -> bool {
    state.outage.load(Ordering::Relaxed)
}

async fn create_tunnel(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(request): Json<Value>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let serial = state.counter.fetch_add(1, Ordering::Relaxed) + 1;
    let tunnel = Tunnel {
        id: format!("tun-{serial}"),
        owner: user,
        status: "running".to_string(),
        is_ready: true,
        creation_time: 1_755_000_000 + serial as i64,
        tunnel_identifier: request
            .get("tunnel_identifier")
            .and_then(Value::as_str)
            .map(str::to_string),
        shared_tunnel: request
            .get("shared_tunnel")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        host: format!("relay-{serial}.mock.internal"),
        metadata: request.get("metadata").cloned().unwrap_or(Value::Null),
    };

    state
        .tunnels
        .write()
        .await
        .insert(tunnel.id.clone(), tunnel.clone());

    let mut body = serde_json::to_value(&tunnel).expect("tunnel serializes");
    body["messages"] = json!({"info": ["tunnel provisioned"]});
    Json(body).into_response()
}

async fn list_tunnels(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let tunnels = state.tunnels.read().await;
    let states: Vec<Value> = tunnels
        .values()
        .filter(|tunnel| tunnel.owner == user)
        .map(|tunnel| serde_json::to_value(tunnel).expect("tunnel serializes"))
        .collect();

    if params.get("all").map(String::as_str) == Some("1") {
        let mut grouped = serde_json::Map::new();
        grouped.insert(user, Value::Array(states));
        Json(Value::Object(grouped)).into_response()
    } else {
        Json(Value::Array(states)).into_response()
    }
}

async fn list_all_tunnels(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let tunnels = state.tunnels.read().await;
    let mut states: Vec<Value> = tunnels
        .values()
        .filter(|tunnel| tunnel.owner == user)
        .map(|tunnel| serde_json::to_value(tunnel).expect("tunnel serializes"))
        .collect();

    if let Some(limit) = params.get("limit").and_then(|limit| limit.parse().ok()) {
        states.truncate(limit);
    }

    Json(json!({"tunnels": states})).into_response()
}

async fn tunnel_state(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let tunnels = state.tunnels.read().await;
    match tunnels.get(&id).filter(|tunnel| tunnel.owner == user) {
        Some(tunnel) => Json(tunnel.clone()).into_response(),
        None => not_found(),
    }
}

// The reason and wait query parameters are accepted but don't change the
// canned answer.
async fn shutdown_tunnel(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
    Query(_params): Query<HashMap<String, String>>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let mut tunnels = state.tunnels.write().await;
    let known = tunnels
        .get(&id)
        .map(|tunnel| tunnel.owner == user)
        .unwrap_or(false);
    if !known {
        return not_found();
    }
    tunnels.remove(&id);

    Json(json!({"jobs_running": 0})).into_response()
}

async fn client_status(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
    Json(report): Json<Value>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let tunnels = state.tunnels.read().await;
    if tunnels
        .get(&id)
        .filter(|tunnel| tunnel.owner == user)
        .is_none()
    {
        return not_found();
    }

    let result = report
        .get("connected")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Json(json!({"id": id, "result": result})).into_response()
}

async fn report_crash(
    State(state): State<AppState>,
    Path(_user): Path<String>,
    Json(_report): Json<Value>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    StatusCode::OK.into_response()
}

async fn updates(
    State(state): State<AppState>,
    Path(_user): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    // Asking for the "nowhere" region yields an answer without a region
    // catalog, so clients can exercise their missing-regions handling.
    if params.get("region").map(String::as_str) == Some("nowhere") {
        return Json(json!({"configuration": {}})).into_response();
    }

    Json(json!({
        "info": ["mock service"],
        "configuration": {
            "client_status_interval": 30,
            "client_status_timeout": 60,
            "server_status_interval": 30,
            "server_status_timeout": 60,
            "start_timeout": 45,
            "regions": [
                {"name": "eu-central", "url": "https://api.eu-central.burrow.example/rest/v1"},
                {"name": "us-west", "url": "https://api.us-west.burrow.example/rest/v1"}
            ]
        }
    }))
    .into_response()
}

async fn versions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if outage(&state) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let latest = "2.4.1";
    let client_version = params.get("client_version").cloned().unwrap_or_default();
    let status = if client_version == latest {
        "UPTODATE"
    } else {
        "UPGRADE"
    };

    let downloads = json!({
        "linux": {
            "download_url": "https://burrow.example/downloads/2.4.1/burrow-linux.tar.gz",
            "sha256": "3f1c6f9a"
        },
        "macos": {
            "download_url": "https://burrow.example/downloads/2.4.1/burrow-macos.tar.gz",
            "sha256": "9b2e44d1"
        }
    });

    let mut body = json!({
        "latest_version": latest,
        "client_version": client_version,
        "status": status,
        "info_url": "https://burrow.example/downloads",
        "download_url": "https://burrow.example/downloads/2.4.1/burrow.tar.gz",
        "sha256": "5d41402a",
        "downloads": downloads.clone(),
    });
    if params.get("all").map(String::as_str) == Some("true") {
        body["all_downloads"] = json!({"2.4.1": downloads});
    }

    Json(body).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"ok": true})).into_response()
}

async fn set_outage(State(state): State<AppState>, Path(enabled): Path<String>) -> Response {
    state.outage.store(enabled == "1", Ordering::Relaxed);
    StatusCode::OK.into_response()
}
