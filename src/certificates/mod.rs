// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manually uploaded TLS certificates.
//!
//! The directory tree under `{base}/certs/` is the only state:
//!
//! ```text
//! certs/
//!   example.com/
//!     fullchain.pem
//!     privkey.pem
//! ```
//!
//! A domain has a certificate iff both files exist as regular files in its
//! directory. `dynamic/tls-manual.yml` is a projection of that tree. It is
//! rebuilt from a full scan after every mutation and never read back.
//!
//! Paths written into the projection live in the proxy's filesystem (the
//! configured mount prefix, `/certs` by default), not in ours.


use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::store::{
    DOCUMENT_MODE, DocumentGuard, SECRET_MODE, StoreError, YamlDocument, ensure_dir, write_atomic,
};
use crate::{debug_fmt, info_fmt};

/// Certificate tree relative to the base directory.
pub const CERTS_DIR: &str = "certs";

/// Generated TLS document relative to the base directory.
pub const TLS_DOCUMENT: &str = "dynamic/tls-manual.yml";

/// Where the proxy sees the certificate tree unless configured otherwise.
pub const DEFAULT_CERTS_MOUNT: &str = "/certs";

pub const CERT_FILE: &str = "fullchain.pem";
pub const KEY_FILE: &str = "privkey.pem";

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*\.)?[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("valid domain regex")
});

/// A complete certificate as the proxy will see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCertificate {
    pub domain: String,
    pub cert_path: String,
    pub key_path: String,
}

/// Root of `dynamic/tls-manual.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsDocument {
    #[serde(default)]
    pub tls: TlsBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsBlock {
    #[serde(default)]
    pub certificates: Vec<CertificateFiles>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFiles {
    pub cert_file: String,
    pub key_file: String,
}

impl From<&ManualCertificate> for CertificateFiles {
    fn from(cert: &ManualCertificate) -> Self {
        Self {
            cert_file: cert.cert_path.clone(),
            key_file: cert.key_path.clone(),
        }
    }
}

/// Check that `domain` is a host name (optionally `*.`-prefixed) and thus a
/// single safe directory name.
pub fn validate_domain(domain: &str) -> Result<(), StoreError> {
    if domain.len() <= 253 && DOMAIN.is_match(domain) {
        Ok(())
    } else {
        Err(StoreError::invalid_name("domain", domain))
    }
}

#[derive(Debug, Clone)]
pub struct ManualCertificateManager {
    certs_dir: PathBuf,
    mount: String,
    document: YamlDocument<TlsDocument>,
}

impl ManualCertificateManager {
    /// Prepare the certificate tree and regenerate the TLS document from it.
    pub fn new(base_dir: impl AsRef<Path>, mount: impl Into<String>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref();
        let certs_dir = base_dir.join(CERTS_DIR);
        ensure_dir(&certs_dir)?;

        let document = YamlDocument::open(base_dir.join(TLS_DOCUMENT), "tls:\n  certificates: []\n")?;
        let mount = mount.into().trim_end_matches('/').to_string();

        let manager = Self {
            certs_dir,
            mount,
            document,
        };
        manager.resync()?;
        Ok(manager)
    }

    pub fn certs_dir(&self) -> &Path {
        &self.certs_dir
    }

    pub fn document_path(&self) -> &Path {
        self.document.path()
    }

    /// Store (or replace) the certificate chain and key of `domain`.
    pub fn add_certificate(&self, domain: &str, cert_pem: &[u8], key_pem: &[u8]) -> Result<(), StoreError> {
        validate_domain(domain)?;
        let guard = self.document.lock();

        let dir = self.domain_dir(domain);
        ensure_dir(&dir)?;
        write_atomic(&dir.join(CERT_FILE), cert_pem, DOCUMENT_MODE)?;
        write_atomic(&dir.join(KEY_FILE), key_pem, SECRET_MODE)?;
        debug_fmt!("Certificates", "Stored certificate for '{}'", domain);

        self.sync(&guard)?;
        Ok(())
    }

    /// Delete the certificate directory of `domain`. Returns whether it existed.
    pub fn remove_certificate(&self, domain: &str) -> Result<bool, StoreError> {
        validate_domain(domain)?;
        let guard = self.document.lock();

        let dir = self.domain_dir(domain);
        let existed = dir.is_dir();
        if existed {
            match fs::remove_dir_all(&dir) {
                Ok(()) => debug_fmt!("Certificates", "Removed certificate for '{}'", domain),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&dir, e)),
            }
        }

        self.sync(&guard)?;
        Ok(existed)
    }

    /// Scan the tree. Directories missing either PEM file, or not named
    /// after a valid domain, are skipped.
    pub fn list_certificates(&self) -> Result<Vec<ManualCertificate>, StoreError> {
        let entries = match fs::read_dir(&self.certs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.certs_dir, e)),
        };

        let mut certificates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.certs_dir, e))?;
            let Ok(domain) = entry.file_name().into_string() else {
                continue;
            };
            if validate_domain(&domain).is_err() {
                debug_fmt!("Certificates", "Skipping '{}': not a domain name", domain);
                continue;
            }

            let dir = entry.path();
            if !dir.is_dir() || !dir.join(CERT_FILE).is_file() || !dir.join(KEY_FILE).is_file() {
                continue;
            }

            certificates.push(ManualCertificate {
                cert_path: self.proxy_path(&domain, CERT_FILE),
                key_path: self.proxy_path(&domain, KEY_FILE),
                domain,
            });
        }

        certificates.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(certificates)
    }

    pub fn certificate_exists(&self, domain: &str) -> Result<bool, StoreError> {
        Ok(self
            .list_certificates()?
            .iter()
            .any(|cert| cert.domain == domain))
    }

    /// Rebuild the TLS document from the tree. Returns the number of
    /// certificates written.
    pub fn resync(&self) -> Result<usize, StoreError> {
        let guard = self.document.lock();
        self.sync(&guard)
    }

    fn sync(&self, guard: &DocumentGuard<'_, TlsDocument>) -> Result<usize, StoreError> {
        let certificates = self.list_certificates()?;
        let document = TlsDocument {
            tls: TlsBlock {
                certificates: certificates.iter().map(CertificateFiles::from).collect(),
            },
        };
        guard.write(&document)?;

        info_fmt!(
            "Certificates",
            "Regenerated {} with {} certificate(s)",
            self.document.path().display(),
            certificates.len()
        );
        Ok(certificates.len())
    }

    fn domain_dir(&self, domain: &str) -> PathBuf {
        self.certs_dir.join(domain)
    }

    fn proxy_path(&self, domain: &str, file: &str) -> String {
        format!("{}/{}/{}", self.mount, domain, file)
    }
}
