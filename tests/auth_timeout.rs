//! Auth timeout supervision over a real socket.

use std::sync::Arc;
use std::time::{Duration, Instant};

use broker_gate::config::{AuthConfig, GateConfig};
use broker_gate::server::NullRouter;
use serde_json::json;

mod common;

use common::{TestServer, TOKEN};

async fn start(auth: AuthConfig, auth_ms: u64) -> TestServer {
    let mut config = GateConfig::default();
    config.auth = auth;
    config.timeouts.auth_ms = auth_ms;
    TestServer::start_with(config, Arc::new(NullRouter)).await
}

#[tokio::test]
async fn silent_client_is_disconnected() {
    let server = start(common::token_auth(TOKEN), 200).await;
    let mut client = server.client().await;

    let started = Instant::now();
    client.expect_info().await;
    client.expect_auth_violation().await;
    client.expect_closed().await;
    assert!(started.elapsed() >= Duration::from_millis(150));

    server.stop().await;
}

#[tokio::test]
async fn admitted_client_outlives_deadline() {
    let server = start(common::token_auth(TOKEN), 200).await;
    let mut client = server.client().await;

    client
        .admit(json!({ "verbose": true, "auth_token": TOKEN }))
        .await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    client.ping().await;

    server.stop().await;
}

#[tokio::test]
async fn silent_client_is_disconnected_without_auth() {
    let server = start(AuthConfig::default(), 200).await;
    let mut client = server.client().await;

    let started = Instant::now();
    let info = client.expect_info().await;
    assert_eq!(info["auth_required"], json!(false));
    client.expect_auth_violation().await;
    client.expect_closed().await;
    assert!(started.elapsed() >= Duration::from_millis(150));

    server.stop().await;
}

#[tokio::test]
async fn prompt_connect_without_auth_outlives_deadline() {
    let server = start(AuthConfig::default(), 200).await;
    let mut client = server.client().await;

    client.admit(json!({ "verbose": true })).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    client.ping().await;

    server.stop().await;
}

#[tokio::test]
async fn shutdown_closes_pending_clients() {
    let server = start(common::token_auth(TOKEN), 10_000).await;
    let mut client = server.client().await;
    client.expect_info().await;

    server.stop().await;
    client.expect_closed().await;
}
