// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::store::{null_as_default, null_as_present};

/// Root of `resolver-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverDocument {
    #[serde(
        rename = "certificatesResolvers",
        default,
        deserialize_with = "null_as_default"
    )]
    pub certificates_resolvers: BTreeMap<String, CertResolver>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A named certificate resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertResolver {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acme: Option<AcmeConfig>,

    /// Resolver kinds other than ACME, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// ACME issuance settings.
///
/// `storage` is owned by the server: whatever a client sends is replaced
/// when the resolver is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub http_challenge: Option<Map<String, Value>>,

    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub tls_challenge: Option<Map<String, Value>>,

    #[serde(
        default,
        deserialize_with = "null_as_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub dns_challenge: Option<Map<String, Value>>,

    /// `caServer`, `keyType`, `eab`, …
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// ACME challenge flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Http,
    Tls,
    Dns,
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeKind::Http => write!(f, "httpChallenge"),
            ChallengeKind::Tls => write!(f, "tlsChallenge"),
            ChallengeKind::Dns => write!(f, "dnsChallenge"),
        }
    }
}

impl AcmeConfig {
    /// The configured challenge. HTTP wins over TLS over DNS when a
    /// document sets more than one.
    pub fn challenge(&self) -> Option<ChallengeKind> {
        if self.http_challenge.is_some() {
            Some(ChallengeKind::Http)
        } else if self.tls_challenge.is_some() {
            Some(ChallengeKind::Tls)
        } else if self.dns_challenge.is_some() {
            Some(ChallengeKind::Dns)
        } else {
            None
        }
    }
}
