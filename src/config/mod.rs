// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Panel configuration subsystem
//!
//! Settings are read from an ordered list of [`ConfigProvider`]s; later
//! providers override earlier ones. The loader stacks them like this:
//!
//! 1. `FileConfigProvider` – `tpm.{toml,json,yaml}`
//! 2. `EnvConfigProvider`  – `TPM_TRAEFIK__API_URL=http://traefik:8080`
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `traefik.config_path`      | path   | `./data/traefik`        | Directory holding every managed document |
//! | `traefik.api_url`          | string | `http://localhost:8080` | Proxy introspection API                  |
//! | `traefik.api_timeout_secs` | int    | `5`                     | Timeout of every API request             |
//! | `traefik.certs_mount`      | string | `/certs`                | Where the proxy sees the certificate tree |
//! | `server.listen`            | string | `127.0.0.1:8090`        | Status endpoint bind address             |
//! | `logging`                  | table  | –                       | See [`LoggingConfig`](crate::logging::config::LoggingConfig) |

mod env;
pub mod error;
mod file;
mod settings;


pub use env::EnvConfigProvider;
pub use error::ConfigError;
pub use file::{FileConfigProvider, FileFormat};
pub use settings::{PanelSettings, ServerSettings};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A source of configuration values addressed by dot-separated keys.
/// Object-safe, so providers can be stacked behind `Arc<dyn ConfigProvider>`.
pub trait ConfigProvider: Debug + Send + Sync {
    fn has(&self, key: &str) -> bool;

    /// Name used in error messages.
    fn provider_name(&self) -> &str;

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError>;
}

/// Typed access on top of [`ConfigProvider`].
pub trait ConfigProviderExt: ConfigProvider {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }
}

impl<T: ConfigProvider> ConfigProviderExt for T {}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. It overrides every provider added before it.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn with_shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Config {
        Config {
            providers: self.providers,
        }
    }
}

/// Stack of providers, queried newest first.
#[derive(Debug, Clone, Default)]
pub struct Config {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        for provider in self.providers.iter().rev() {
            if provider.has(key) {
                return provider.get_raw(key);
            }
        }
        Ok(None)
    }

    /// Value of `key` from the newest provider that has it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    pub fn get_or_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(key)? {
            Some(value) => Ok(value),
            None => Ok(default),
        }
    }

    pub fn default_file(file_path: &str) -> Result<Self, ConfigError> {
        let provider = FileConfigProvider::new(file_path)?;
        Ok(Self::builder().with_provider(provider).build())
    }
}
