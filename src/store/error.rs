// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the document store and the managers built on it.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing a managed document.
///
/// Expected conditions (deleting an entry that does not exist, removing a
/// certificate that was never uploaded) are reported through `bool` return
/// values and never show up here.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The document on disk exists but is not valid YAML for its schema.
    #[error("malformed document {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The in-memory document could not be serialized.
    #[error("failed to serialize document {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A filesystem operation failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A name that ends up in a filesystem path is not a single safe segment.
    #[error("invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },
}

impl StoreError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid_name(kind: &'static str, name: impl Into<String>) -> Self {
        Self::InvalidName {
            kind,
            name: name.into(),
        }
    }

    /// Whether the error was caused by caller input rather than server state.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidName { .. })
    }
}
