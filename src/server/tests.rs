// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Status server on an OS-assigned port whose proxy API can never answer.
async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<io::Result<()>>) {
    let client = ProxyApiClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    let server = StatusServer::bind("127.0.0.1:0", client).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_until(async {
        let _ = rx.await;
    }));
    (addr, tx, handle)
}

async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _tx, _handle) = spawn_server().await;

    assert_eq!(get(addr, "/health").await, (200, "OK".to_string()));
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let (addr, _tx, _handle) = spawn_server().await;

    assert_eq!(get(addr, "/ready").await, (404, "Not Found".to_string()));
}

#[tokio::test]
async fn test_non_get_is_rejected() {
    let (addr, _tx, _handle) = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 405);
}

#[tokio::test]
async fn test_status_reports_unreachable_proxy_as_down() {
    let (addr, _tx, _handle) = spawn_server().await;

    let response = reqwest::get(format!("http://{addr}/status")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "DOWN");
    assert!(body["error"].as_str().unwrap().contains("unreachable"));
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let (addr, tx, handle) = spawn_server().await;
    assert_eq!(get(addr, "/health").await.0, 200);

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(10), handle).await;
    assert!(result.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let (addr, _tx, _handle) = spawn_server().await;
    let client = ProxyApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();

    let result = StatusServer::bind(&addr.to_string(), client).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_idle_keep_alive_connection_does_not_delay_shutdown() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (addr, tx, handle) = spawn_server().await;
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut response = Vec::new();
    let mut buf = [0u8; 512];
    while !response.ends_with(b"\r\n\r\nOK") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before the response arrived");
        response.extend_from_slice(&buf[..n]);
    }

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(result.expect("shutdown waited for the idle connection").unwrap().is_ok());

    // The server closed its side of the connection.
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_many_sequential_connections() {
    let (addr, tx, handle) = spawn_server().await;
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();

    for _ in 0..50 {
        let response = client.get(format!("http://{addr}/health")).send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(result.unwrap().unwrap().is_ok());
}
