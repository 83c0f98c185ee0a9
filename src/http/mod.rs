// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP configuration manager.
//!
//! Owns `dynamic/http-config.yaml`: the routers, services and middlewares of
//! the proxy's `http` block. Each call is one locked read-modify-write of the
//! whole document. Empty maps are pruned and the `http` key disappears once
//! nothing is left in it.
//!
//! Deleting a service that a router still points at is allowed; no
//! referential checks are made between the three maps.

mod model;


pub use model::{
    HttpBlock, HttpDocument, HttpRouter, HttpService, LoadBalancer, Middleware,
    MiddlewareOptions, RouterTls, Server,
};

use std::collections::BTreeMap;
use std::path::Path;

use crate::debug_fmt;
use crate::store::{StoreError, YamlDocument, ensure_entry_name};

/// Location of the HTTP document relative to the base directory.
pub const HTTP_DOCUMENT: &str = "dynamic/http-config.yaml";

type Select<V> = fn(&mut HttpBlock) -> &mut BTreeMap<String, V>;

#[derive(Debug, Clone)]
pub struct HttpManager {
    document: YamlDocument<HttpDocument>,
}

impl HttpManager {
    /// Open (and if needed create) the HTTP document under `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let document = YamlDocument::open(base_dir.as_ref().join(HTTP_DOCUMENT), "\n")?;
        Ok(Self { document })
    }

    pub fn document_path(&self) -> &Path {
        self.document.path()
    }

    /// The whole parsed document.
    pub fn document(&self) -> Result<HttpDocument, StoreError> {
        self.document.read()
    }

    pub fn get_routers(&self) -> Result<BTreeMap<String, HttpRouter>, StoreError> {
        Ok(self.block()?.routers)
    }

    pub fn get_services(&self) -> Result<BTreeMap<String, HttpService>, StoreError> {
        Ok(self.block()?.services)
    }

    pub fn get_middlewares(&self) -> Result<BTreeMap<String, Middleware>, StoreError> {
        Ok(self.block()?.middlewares)
    }

    /// Insert or replace a router; `None` removes it.
    pub fn upsert_router(&self, name: &str, data: Option<HttpRouter>) -> Result<(), StoreError> {
        self.upsert("router", |block| &mut block.routers, name, data)
    }

    /// Insert or replace a service; `None` removes it.
    pub fn upsert_service(&self, name: &str, data: Option<HttpService>) -> Result<(), StoreError> {
        self.upsert("service", |block| &mut block.services, name, data)
    }

    /// Insert or replace a middleware; `None` removes it.
    pub fn upsert_middleware(&self, name: &str, data: Option<Middleware>) -> Result<(), StoreError> {
        self.upsert("middleware", |block| &mut block.middlewares, name, data)
    }

    /// Remove a router. Returns `false` when no router had that name.
    pub fn delete_router(&self, name: &str) -> Result<bool, StoreError> {
        self.delete("router", |block| &mut block.routers, name)
    }

    /// Remove a service. Returns `false` when no service had that name.
    pub fn delete_service(&self, name: &str) -> Result<bool, StoreError> {
        self.delete("service", |block| &mut block.services, name)
    }

    /// Remove a middleware. Returns `false` when no middleware had that name.
    pub fn delete_middleware(&self, name: &str) -> Result<bool, StoreError> {
        self.delete("middleware", |block| &mut block.middlewares, name)
    }

    fn block(&self) -> Result<HttpBlock, StoreError> {
        Ok(self.document.read()?.http.unwrap_or_default())
    }

    fn upsert<V>(
        &self,
        kind: &'static str,
        select: Select<V>,
        name: &str,
        data: Option<V>,
    ) -> Result<(), StoreError> {
        ensure_entry_name(kind, name)?;
        let removing = data.is_none();

        self.document.update(|doc| {
            let block = doc.http.get_or_insert_with(HttpBlock::default);
            let entries = select(block);
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

        if removing {
            debug_fmt!("HttpManager", "Removed {} '{}'", kind, name);
        } else {
            debug_fmt!("HttpManager", "Stored {} '{}'", kind, name);
        }
        Ok(())
    }

    fn delete<V>(&self, kind: &'static str, select: Select<V>, name: &str) -> Result<bool, StoreError> {
        let removed = self.document.update_if(|doc| {
            let Some(block) = doc.http.as_mut() else {
                return false;
            };
            let removed = select(block).remove(name).is_some();
            doc.prune();
            removed
        })?;

        if removed {
            debug_fmt!("HttpManager", "Deleted {} '{}'", kind, name);
        }
        Ok(removed)
    }
}
