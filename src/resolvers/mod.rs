// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Certificate resolver manager.
//!
//! Owns `resolver-config.yaml`. Every ACME resolver persists its account and
//! certificates to `{base}/acme/{name}.json`; the path is computed here and
//! written over anything the caller supplied, so no two resolvers share a
//! state file and no client can point the proxy at an arbitrary path.
//!
//! Deleting a resolver leaves its ACME state file on disk.

mod model;


pub use model::{AcmeConfig, CertResolver, ChallengeKind, ResolverDocument};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::store::{StoreError, YamlDocument, ensure_dir, ensure_safe_segment};
use crate::{debug_fmt, info_fmt};

/// Location of the resolver document relative to the base directory.
pub const RESOLVER_DOCUMENT: &str = "resolver-config.yaml";

/// Directory of ACME state files relative to the base directory.
pub const ACME_DIR: &str = "acme";

#[derive(Debug, Clone)]
pub struct ResolverManager {
    document: YamlDocument<ResolverDocument>,
    acme_dir: PathBuf,
}

impl ResolverManager {
    /// Open the resolver document and make sure the ACME and certificate
    /// directories exist under `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref();
        let acme_dir = base_dir.join(ACME_DIR);
        ensure_dir(&acme_dir)?;
        ensure_dir(&base_dir.join(crate::certificates::CERTS_DIR))?;

        let document = YamlDocument::open(
            base_dir.join(RESOLVER_DOCUMENT),
            "certificatesResolvers: {}\n",
        )?;
        Ok(Self { document, acme_dir })
    }

    pub fn document_path(&self) -> &Path {
        self.document.path()
    }

    /// Where the ACME state of resolver `name` lives.
    pub fn storage_path(&self, name: &str) -> PathBuf {
        self.acme_dir.join(format!("{name}.json"))
    }

    /// All resolvers as stored, including their real storage paths.
    pub fn get_resolvers(&self) -> Result<BTreeMap<String, CertResolver>, StoreError> {
        Ok(self.document.read()?.certificates_resolvers)
    }

    /// Insert or replace a resolver, forcing its ACME storage location.
    pub fn upsert_resolver(&self, name: &str, mut data: CertResolver) -> Result<(), StoreError> {
        ensure_safe_segment("resolver", name)?;

        if let Some(acme) = data.acme.as_mut() {
            let storage = self.storage_path(name).to_string_lossy().into_owned();
            if acme.storage.as_deref().is_some_and(|supplied| supplied != storage) {
                info_fmt!("ResolverManager", "Ignoring client supplied ACME storage for resolver '{}'", name);
            }
            acme.storage = Some(storage);
        }

        self.document.update(|doc| {
            doc.certificates_resolvers.insert(name.to_string(), data);
        })?;

        debug_fmt!("ResolverManager", "Stored resolver '{}'", name);
        Ok(())
    }

    /// Remove a resolver. Returns `false` when it did not exist.
    pub fn delete_resolver(&self, name: &str) -> Result<bool, StoreError> {
        let removed = self
            .document
            .update_if(|doc| doc.certificates_resolvers.remove(name).is_some())?;

        if removed {
            debug_fmt!("ResolverManager", "Deleted resolver '{}'", name);
        }
        Ok(removed)
    }
}
