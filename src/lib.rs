// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TPM - configuration document manager for a Traefik management panel
//!
//! The proxy watches a directory of YAML documents through its file
//! provider. This crate owns those documents:
//!
//! | document                       | manager                       |
//! |--------------------------------|-------------------------------|
//! | `dynamic/http-config.yaml`     | [`HttpManager`]               |
//! | `dynamic/tcp-udp-config.yaml`  | [`TcpUdpManager`]             |
//! | `resolver-config.yaml`         | [`ResolverManager`]           |
//! | `dynamic/tls-manual.yml`       | [`ManualCertificateManager`]  |
//!
//! Every mutation is a locked read-modify-write that replaces the file
//! atomically, so the proxy never observes a half-written document and
//! concurrent requests never lose each other's updates. Fields the panel
//! does not model are carried through untouched.
//!
//! [`ProxyApiClient`] reads the proxy's introspection API and derives a
//! health state from it.
//!
//! ```rust,no_run
//! use tpm::Panel;
//!
//! # async fn run() -> Result<(), tpm::LoaderError> {
//! let panel = Panel::loader()
//!     .with_config_file("tpm.toml")
//!     .with_env_vars()
//!     .build()?;
//!
//! panel.http().delete_router("legacy")?;
//! println!("{}", panel.status().status().await.status);
//! # Ok(())
//! # }
//! ```

pub mod certificates;
pub mod config;
pub mod http;
pub mod loader;
pub mod logging;
pub mod resolvers;
pub mod server;
pub mod status;
pub mod store;
pub mod transport;

pub use certificates::{ManualCertificate, ManualCertificateManager};
pub use config::{Config, ConfigError, ConfigProvider, ConfigProviderExt, PanelSettings};
pub use http::HttpManager;
pub use loader::{LoaderError, Panel, PanelLoader};
pub use resolvers::ResolverManager;
pub use server::StatusServer;
pub use status::{HealthState, ProxyApiClient, StatusReport};
pub use store::{StoreError, YamlDocument};
pub use transport::{Protocol, TcpUdpManager};
