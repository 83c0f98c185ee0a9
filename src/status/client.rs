// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the proxy's read-only API.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::{StatusReport, derive_status};
use crate::{debug_fmt, warn_fmt};

/// Why a probe against the introspection API failed.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Connection refused, DNS failure, timeout …
    #[error("proxy unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The proxy answered, but not with a success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// `/ping` answered with something other than `OK`.
    #[error("unexpected ping response: {0:?}")]
    Unhealthy(String),

    /// The body could not be read or decoded.
    #[error("invalid response body: {0}")]
    InvalidBody(#[source] reqwest::Error),
}

/// Section of the API a list endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiSection {
    Http,
    Tcp,
    Udp,
}

impl ApiSection {
    pub const ALL: [ApiSection; 3] = [ApiSection::Http, ApiSection::Tcp, ApiSection::Udp];

    pub fn as_str(self) -> &'static str {
        match self {
            ApiSection::Http => "http",
            ApiSection::Tcp => "tcp",
            ApiSection::Udp => "udp",
        }
    }
}

impl fmt::Display for ApiSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProxyApiClient {
    base_url: String,
    client: Client,
}

impl ProxyApiClient {
    /// Client for the API at `base_url` (e.g. `http://traefik:8080`).
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(self.url("/ping"))
            .send()
            .await
            .map_err(ProbeError::Unreachable)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(ProbeError::InvalidBody)?;
        if body.trim() == "OK" {
            Ok(())
        } else {
            Err(ProbeError::Unhealthy(body.trim().to_string()))
        }
    }

    /// The raw dynamic configuration as seen by the proxy.
    pub async fn rawdata(&self) -> Result<Value, ProbeError> {
        self.get_json("/api/rawdata").await
    }

    /// Per-section counters of routers, services and middlewares.
    pub async fn overview(&self) -> Result<Value, ProbeError> {
        self.get_json("/api/overview").await
    }

    pub async fn routers(&self, section: ApiSection) -> Vec<Value> {
        self.list(section, "routers").await
    }

    pub async fn services(&self, section: ApiSection) -> Vec<Value> {
        self.list(section, "services").await
    }

    pub async fn middlewares(&self, section: ApiSection) -> Vec<Value> {
        self.list(section, "middlewares").await
    }

    /// Probe the proxy and derive its health state.
    pub async fn status(&self) -> StatusReport {
        if let Err(e) = self.ping().await {
            warn_fmt!("ProxyApi", "Liveness check against {} failed: {}", self.base_url, e);
            return derive_status(Err(e), &Value::Null, &Value::Null);
        }

        let rawdata = self.rawdata().await.unwrap_or_else(|e| {
            warn_fmt!("ProxyApi", "Could not read rawdata: {}", e);
            Value::Null
        });
        let overview = self.overview().await.unwrap_or_else(|e| {
            warn_fmt!("ProxyApi", "Could not read overview: {}", e);
            Value::Null
        });

        let report = derive_status(Ok(()), &rawdata, &overview);
        debug_fmt!("ProxyApi", "Proxy status is {}", report.status);
        report
    }

    /// List endpoint. Arrays pass through, objects become their values and
    /// every failure yields an empty list.
    async fn list(&self, section: ApiSection, kind: &str) -> Vec<Value> {
        let path = format!("/api/{section}/{kind}");
        match self.get_json(&path).await {
            Ok(Value::Array(items)) => items,
            Ok(Value::Object(map)) => map.into_iter().map(|(_, value)| value).collect(),
            Ok(_) => Vec::new(),
            Err(e) => {
                warn_fmt!("ProxyApi", "GET {} failed: {}", path, e);
                Vec::new()
            }
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, ProbeError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(ProbeError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }
        response.json().await.map_err(ProbeError::InvalidBody)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
