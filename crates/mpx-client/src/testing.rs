//! In-process Mathpix API fixtures for unit tests.

use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::{MpxClient, MpxConfig, MpxCredentials};

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve test router");
    });

    format!("http://{addr}")
}

/// Client pointed at `api_url` with fast retries and polling.
pub(crate) fn test_client(api_url: &str) -> MpxClient {
    let config = MpxConfig::builder()
        .with_api_url(api_url)
        .expect("valid test URL")
        .with_timeout(Duration::from_secs(5))
        .with_retry_backoff(Duration::from_millis(5))
        .with_poll_interval(Duration::from_millis(10))
        .build()
        .expect("valid test config");
    let credentials = MpxCredentials::new("test-app", "test-key").expect("valid credentials");

    MpxClient::new(config, credentials).expect("test client")
}
