// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal HTTP endpoint exposing the proxy status.
//!
//! | path      | response                              |
//! |-----------|---------------------------------------|
//! | `/health` | `200 OK`, body `OK`                   |
//! | `/status` | `200`, JSON [`StatusReport`]          |
//! | other     | `404 Not Found`                       |
//!
//! [`StatusReport`]: crate::status::StatusReport

#[cfg(test)]
mod tests;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::status::ProxyApiClient;
use crate::{debug_fmt, error_fmt, info_fmt};

/// How long open connections may take to finish after shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct StatusServer {
    listener: TcpListener,
    client: Arc<ProxyApiClient>,
}

impl StatusServer {
    pub async fn bind(addr: &str, client: ProxyApiClient) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            client: Arc::new(client),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> io::Result<()> {
        #[cfg(unix)]
        let mut term_stream = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        let shutdown = async move {
            #[cfg(unix)]
            let sigterm = term_stream.recv();
            #[cfg(not(unix))]
            let sigterm = std::future::pending::<Option<()>>();

            tokio::select! {
                _ = signal::ctrl_c() => info_fmt!("StatusServer", "Received Ctrl-C; shutting down"),
                _ = sigterm => info_fmt!("StatusServer", "Received SIGTERM; shutting down"),
            }
        };
        self.serve_until(shutdown).await
    }

    /// Serve until `shutdown` completes, then give open connections
    /// a short grace period.
    pub async fn serve_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.listener.local_addr()?;
        info_fmt!("StatusServer", "Listening on http://{}", addr);

        let mut connections = JoinSet::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accept = self.listener.accept() => {
                    let (stream, remote_addr) = match accept {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error_fmt!("StatusServer", "Accept error: {}", e);
                            continue;
                        }
                    };

                    let client = self.client.clone();
                    let mut stop = stop_rx.clone();
                    connections.spawn(async move {
                        let service = service_fn(move |req| handle(req, client.clone()));
                        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                        let mut conn = std::pin::pin!(conn);

                        let result = tokio::select! {
                            res = &mut conn => res,
                            _ = stop.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.await
                            }
                        };
                        if let Err(e) = result {
                            debug_fmt!("StatusServer", "Connection from {} ended: {}", remote_addr, e);
                        }
                    });
                }
            }
        }

        let _ = stop_tx.send(true);
        info_fmt!("StatusServer", "Waiting for {} connection(s)", connections.len());
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            connections.abort_all();
        }
        Ok(())
    }
}

async fn handle(
    req: Request<Incoming>,
    client: Arc<ProxyApiClient>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET {
        return Ok(text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
    }

    let response = match req.uri().path() {
        "/health" => text(StatusCode::OK, "OK"),
        "/status" => {
            let report = client.status().await;
            match serde_json::to_vec(&report) {
                Ok(body) => Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Full::new(Bytes::from(body)))
                    .unwrap_or_else(|_| text(StatusCode::INTERNAL_SERVER_ERROR, "")),
                Err(e) => {
                    error_fmt!("StatusServer", "Cannot encode status report: {}", e);
                    text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                }
            }
        }
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    };
    Ok(response)
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
