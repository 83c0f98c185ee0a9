// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document store – typed read-modify-write over a single YAML file.
//!
//! Every manager in this crate owns one or more [`YamlDocument`]s. A document
//! handle carries no cached state besides its path: each operation reads the
//! file, mutates an in-memory value and writes the whole value back.
//!
//! Writes go to a sibling temporary file that is renamed over the target, so
//! a concurrent reader (the proxy itself, polling the directory) only ever
//! sees a complete document. Writers are serialized by a process-wide mutex
//! keyed by the absolute document path; two handles opened on the same file
//! share that mutex.

mod error;

#[cfg(test)]
mod tests;

pub use error::StoreError;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;

use crate::trace_fmt;

/// Permission bits for documents the proxy has to read.
pub(crate) const DOCUMENT_MODE: u32 = 0o644;

/// Permission bits for private key material.
pub(crate) const SECRET_MODE: u32 = 0o600;

static DOCUMENT_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static SAFE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("valid segment regex"));

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = DOCUMENT_LOCKS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(key).or_default().clone()
}

/// Handle to a YAML document of type `T` stored at a fixed path.
pub struct YamlDocument<T> {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for YamlDocument<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlDocument")
            .field("path", &self.path)
            .finish()
    }
}

impl<T> Clone for YamlDocument<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            lock: self.lock.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> YamlDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open a document, creating its directory and writing `placeholder`
    /// when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>, placeholder: &str) -> Result<Self, StoreError> {
        let path = path.into();
        let document = Self {
            lock: lock_for(&path),
            path,
            _marker: PhantomData,
        };

        let guard = document.lock();
        if !document.path.exists() {
            trace_fmt!("Store", "Creating placeholder document {}", document.path.display());
            write_atomic(&document.path, placeholder.as_bytes(), DOCUMENT_MODE)?;
        }
        drop(guard);

        Ok(document)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document.
    ///
    /// A missing file, an empty file or a YAML `null` document all yield
    /// `T::default()`. Content that does not parse is an error.
    pub fn read(&self) -> Result<T, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        parse(&self.path, &content)
    }

    /// Serialize and atomically replace the document.
    pub fn write(&self, document: &T) -> Result<(), StoreError> {
        let content = serde_yaml::to_string(document).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, content.as_bytes(), DOCUMENT_MODE)
    }

    /// Acquire the per-path writer lock.
    pub fn lock(&self) -> DocumentGuard<'_, T> {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        DocumentGuard {
            document: self,
            _guard: guard,
        }
    }

    /// Locked read, mutate, write. The document is always written back.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let guard = self.lock();
        let mut value = guard.read()?;
        let result = mutate(&mut value);
        guard.write(&value)?;
        Ok(result)
    }

    /// Locked read, mutate, write – the write only happens when `mutate`
    /// returns `true`. Returns what `mutate` returned.
    pub fn update_if(&self, mutate: impl FnOnce(&mut T) -> bool) -> Result<bool, StoreError> {
        let guard = self.lock();
        let mut value = guard.read()?;
        let changed = mutate(&mut value);
        if changed {
            guard.write(&value)?;
        }
        Ok(changed)
    }
}

/// Proof that the caller holds the writer lock of a document.
pub struct DocumentGuard<'a, T> {
    document: &'a YamlDocument<T>,
    _guard: MutexGuard<'a, ()>,
}

impl<T> DocumentGuard<'_, T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Read the document while holding the lock.
    pub fn read(&self) -> Result<T, StoreError> {
        self.document.read()
    }

    /// Replace the document while holding the lock.
    pub fn write(&self, value: &T) -> Result<(), StoreError> {
        self.document.write(value)
    }
}

fn parse<T>(path: &Path, content: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    if is_blank(content) {
        return Ok(T::default());
    }

    let malformed = |source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(malformed)?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(malformed)
}

fn is_blank(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Write `contents` to `path` through a temporary file in the same directory.
pub(crate) fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut file = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    file.write_all(contents)
        .and_then(|_| file.as_file().sync_all())
        .and_then(|_| set_mode(file.as_file(), mode))
        .map_err(|e| StoreError::io(path, e))?;
    file.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// `mkdir -p`, mapped into a [`StoreError`].
pub(crate) fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
}

/// Reject names that would not stay a single component once joined to a path.
pub(crate) fn ensure_safe_segment(kind: &'static str, name: &str) -> Result<(), StoreError> {
    if SAFE_SEGMENT.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::invalid_name(kind, name))
    }
}

/// Entry names are map keys in a dynamic document; the proxy reserves `@`
/// for its `name@provider` references.
pub(crate) fn ensure_entry_name(kind: &'static str, name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() || name.contains('@') {
        Err(StoreError::invalid_name(kind, name))
    } else {
        Ok(())
    }
}

/// Deserialize an explicit YAML `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// For optional blocks that are enabled by their key alone (`compress: ~`):
/// an explicit `null` reads as an empty block instead of an absent one.
/// Pair with `#[serde(default)]` so a missing key stays `None`.
pub(crate) fn null_as_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?.unwrap_or_default()))
}

#[cfg(unix)]
fn set_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}
