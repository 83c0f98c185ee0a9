// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed view of the `http` block of a dynamic configuration document.
//!
//! Known fields are typed; anything else is kept in an `extra` side map that
//! is flattened back on serialization, so hand-written or newer keys survive
//! a read-modify-write cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::store::{null_as_default, null_as_present};

/// Free-form options of a single middleware behaviour.
pub type MiddlewareOptions = Map<String, Value>;

/// Root of `dynamic/http-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpBlock>,

    /// Top-level keys other than `http`, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HttpDocument {
    /// Drop the `http` key when nothing is left inside it.
    pub fn prune(&mut self) {
        if self.http.as_ref().is_some_and(HttpBlock::is_empty) {
            self.http = None;
        }
    }
}

/// The `http` section. Empty maps are never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpBlock {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub routers: BTreeMap<String, HttpRouter>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub services: BTreeMap<String, HttpService>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub middlewares: BTreeMap<String, Middleware>,

    /// e.g. `serversTransports`, which this panel does not manage.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HttpBlock {
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
            && self.services.is_empty()
            && self.middlewares.is_empty()
            && self.extra.is_empty()
    }
}

/// An HTTP router: matches requests by `rule` and forwards them to `service`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_points: Option<Vec<String>>,

    pub rule: String,

    /// Name of the service; not checked against the services map.
    pub service: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middlewares: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouterTls>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// TLS settings of a router.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_resolver: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An HTTP service backed by a single load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpService {
    pub load_balancer: LoadBalancer,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HttpService {
    /// Service with one server per URL, in the given order.
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            load_balancer: LoadBalancer {
                servers: urls.into_iter().map(Server::new).collect(),
                extra: BTreeMap::new(),
            },
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub servers: Vec<Server>,

    /// `passHostHeader`, `healthCheck`, `sticky`, …
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,

    /// `weight`, `preservePath`, …
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// A middleware definition.
///
/// Exactly one behaviour is expected to be populated. The set of known
/// behaviours is open: a key that is not listed here lands in `extra`
/// (plugins, behaviours added by newer proxy releases) and is written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Middleware {
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub basicauth: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub headers: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub digestauth: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub chain: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub compress: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub errorpage: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ipwhitelist: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ratelimit: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub redirectregex: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub redirectscheme: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub replacepath: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub replacepathregex: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub stripprefix: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub stripprefixregex: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry: Option<MiddlewareOptions>,
    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub requestheader: Option<MiddlewareOptions>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Middleware {
    fn known(&self) -> [(&'static str, bool); 16] {
        [
            ("basicauth", self.basicauth.is_some()),
            ("headers", self.headers.is_some()),
            ("digestauth", self.digestauth.is_some()),
            ("chain", self.chain.is_some()),
            ("compress", self.compress.is_some()),
            ("errorpage", self.errorpage.is_some()),
            ("ipwhitelist", self.ipwhitelist.is_some()),
            ("ratelimit", self.ratelimit.is_some()),
            ("redirectregex", self.redirectregex.is_some()),
            ("redirectscheme", self.redirectscheme.is_some()),
            ("replacepath", self.replacepath.is_some()),
            ("replacepathregex", self.replacepathregex.is_some()),
            ("stripprefix", self.stripprefix.is_some()),
            ("stripprefixregex", self.stripprefixregex.is_some()),
            ("retry", self.retry.is_some()),
            ("requestheader", self.requestheader.is_some()),
        ]
    }

    /// Name of the behaviour this middleware configures, known or not.
    pub fn kind(&self) -> Option<&str> {
        if let Some((name, _)) = self.known().into_iter().find(|(_, populated)| *populated) {
            return Some(name);
        }
        self.extra.keys().next().map(String::as_str)
    }

    /// Whether no behaviour at all is configured.
    pub fn is_empty(&self) -> bool {
        self.kind().is_none()
    }
}
