// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed views over the `traefik` and `server` configuration keys.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::{Config, ConfigError};
use crate::certificates::DEFAULT_CERTS_MOUNT;

/// Where the managed documents live and how to reach the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Base directory of every document the panel writes.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    /// Certificate tree prefix as mounted inside the proxy container.
    #[serde(default = "default_certs_mount")]
    pub certs_mount: String,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("./data/traefik")
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_timeout_secs() -> u64 {
    5
}

fn default_certs_mount() -> String {
    DEFAULT_CERTS_MOUNT.to_string()
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            api_url: default_api_url(),
            api_timeout_secs: default_api_timeout_secs(),
            certs_mount: default_certs_mount(),
        }
    }
}

impl PanelSettings {
    pub const KEY: &'static str = "traefik";

    /// Read field by field so a single overridden leaf (say from the
    /// environment) does not shadow the rest of a file-provided table.
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        let defaults = config.get_or_default(Self::KEY, Self::default())?;
        Ok(Self {
            config_path: config.get_or_default("traefik.config_path", defaults.config_path)?,
            api_url: config.get_or_default("traefik.api_url", defaults.api_url)?,
            api_timeout_secs: config
                .get_or_default("traefik.api_timeout_secs", defaults.api_timeout_secs)?,
            certs_mount: config.get_or_default("traefik.certs_mount", defaults.certs_mount)?,
        })
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Status endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8090".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSettings {
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        let defaults: Self = config.get_or_default("server", Self::default())?;
        Ok(Self {
            listen: config.get_or_default("server.listen", defaults.listen)?,
        })
    }
}
