// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TCP/UDP configuration manager.
//!
//! Same contract as the HTTP manager, over `dynamic/tcp-udp-config.yaml` and
//! the `tcp` / `udp` sections. Router and service payloads are stored as
//! opaque JSON-like values.


use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::debug_fmt;
use crate::store::{StoreError, YamlDocument, ensure_entry_name, null_as_default};

/// Location of the TCP/UDP document relative to the base directory.
pub const TCP_UDP_DOCUMENT: &str = "dynamic/tcp-udp-config.yaml";

/// Transport section of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Root of `dynamic/tcp-udp-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcpUdpDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TransportBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<TransportBlock>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TcpUdpDocument {
    fn section(&self, protocol: Protocol) -> Option<&TransportBlock> {
        match protocol {
            Protocol::Tcp => self.tcp.as_ref(),
            Protocol::Udp => self.udp.as_ref(),
        }
    }

    fn section_mut(&mut self, protocol: Protocol) -> &mut Option<TransportBlock> {
        match protocol {
            Protocol::Tcp => &mut self.tcp,
            Protocol::Udp => &mut self.udp,
        }
    }

    /// Drop sections that have nothing left in them.
    pub fn prune(&mut self) {
        for protocol in [Protocol::Tcp, Protocol::Udp] {
            let section = self.section_mut(protocol);
            if section.as_ref().is_some_and(TransportBlock::is_empty) {
                *section = None;
            }
        }
    }
}

/// A `tcp` or `udp` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportBlock {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub routers: BTreeMap<String, Value>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub services: BTreeMap<String, Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TransportBlock {
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty() && self.services.is_empty() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Entity {
    Router,
    Service,
}

impl Entity {
    fn label(self) -> &'static str {
        match self {
            Entity::Router => "router",
            Entity::Service => "service",
        }
    }

    fn entries(self, block: &mut TransportBlock) -> &mut BTreeMap<String, Value> {
        match self {
            Entity::Router => &mut block.routers,
            Entity::Service => &mut block.services,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpUdpManager {
    document: YamlDocument<TcpUdpDocument>,
}

impl TcpUdpManager {
    /// Open (and if needed create) the TCP/UDP document under `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let document = YamlDocument::open(base_dir.as_ref().join(TCP_UDP_DOCUMENT), "")?;
        Ok(Self { document })
    }

    pub fn document_path(&self) -> &Path {
        self.document.path()
    }

    pub fn document(&self) -> Result<TcpUdpDocument, StoreError> {
        self.document.read()
    }

    pub fn get_routers(&self, protocol: Protocol) -> Result<BTreeMap<String, Value>, StoreError> {
        let doc = self.document.read()?;
        Ok(doc.section(protocol).map(|block| block.routers.clone()).unwrap_or_default())
    }

    pub fn get_services(&self, protocol: Protocol) -> Result<BTreeMap<String, Value>, StoreError> {
        let doc = self.document.read()?;
        Ok(doc.section(protocol).map(|block| block.services.clone()).unwrap_or_default())
    }

    /// Insert or replace a router; `None` removes it.
    pub fn upsert_router(
        &self,
        protocol: Protocol,
        name: &str,
        data: Option<Value>,
    ) -> Result<(), StoreError> {
        self.upsert(protocol, Entity::Router, name, data)
    }

    /// Insert or replace a service; `None` removes it.
    pub fn upsert_service(
        &self,
        protocol: Protocol,
        name: &str,
        data: Option<Value>,
    ) -> Result<(), StoreError> {
        self.upsert(protocol, Entity::Service, name, data)
    }

    /// Remove a router. Returns `false` when it did not exist.
    pub fn delete_router(&self, protocol: Protocol, name: &str) -> Result<bool, StoreError> {
        self.delete(protocol, Entity::Router, name)
    }

    /// Remove a service. Returns `false` when it did not exist.
    pub fn delete_service(&self, protocol: Protocol, name: &str) -> Result<bool, StoreError> {
        self.delete(protocol, Entity::Service, name)
    }

    fn upsert(
        &self,
        protocol: Protocol,
        entity: Entity,
        name: &str,
        data: Option<Value>,
    ) -> Result<(), StoreError> {
        ensure_entry_name(entity.label(), name)?;
        // A JSON null payload is the same delete signal as `None`.
        let data = data.filter(|value| !value.is_null());
        let removing = data.is_none();

        self.document.update(|doc| {
            let block = doc
                .section_mut(protocol)
                .get_or_insert_with(TransportBlock::default);
            let entries = entity.entries(block);
            match data {
                Some(value) => {
                    entries.insert(name.to_string(), value);
                }
                None => {
                    entries.remove(name);
                }
            }
            doc.prune();
        })?;

        debug_fmt!(
            "TcpUdpManager",
            "{} {} {} '{}'",
            if removing { "Removed" } else { "Stored" },
            protocol,
            entity.label(),
            name
        );
        Ok(())
    }

    fn delete(&self, protocol: Protocol, entity: Entity, name: &str) -> Result<bool, StoreError> {
        let removed = self.document.update_if(|doc| {
            let Some(block) = doc.section_mut(protocol).as_mut() else {
                return false;
            };
            let removed = entity.entries(block).remove(name).is_some();
            doc.prune();
            removed
        })?;

        if removed {
            debug_fmt!("TcpUdpManager", "Deleted {} {} '{}'", protocol, entity.label(), name);
        }
        Ok(removed)
    }
}
