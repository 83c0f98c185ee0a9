// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level entry point.
//!
//! [`PanelLoader`] consumes configuration, initializes logging and builds
//! every document manager exactly once. The resulting [`Panel`] hands them
//! out to whatever request layer sits on top, and can serve the status
//! endpoint itself.


use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::certificates::ManualCertificateManager;
use crate::config::{
    Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider, PanelSettings,
    ServerSettings,
};
use crate::http::HttpManager;
use crate::logging::{self, config::LoggingConfig};
use crate::resolvers::ResolverManager;
use crate::server::StatusServer;
use crate::status::ProxyApiClient;
use crate::store::StoreError;
use crate::transport::TcpUdpManager;
use crate::{info_fmt, warn_fmt};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("document store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("cannot build proxy API client: {0}")]
    ClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Default)]
pub struct PanelLoader {
    config: Option<Config>,
    config_file_path: Option<String>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl PanelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a prepared configuration instead of file and environment.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Layer `TPM_*` environment variables over the file.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    /// Add a provider on top of all others.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn build(self) -> Result<Panel, LoaderError> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let mut builder = Config::builder();

                if let Some(file_path) = &self.config_file_path {
                    builder = builder.with_provider(FileConfigProvider::new(file_path)?);
                }

                if self.use_env_vars {
                    let env_provider = match &self.env_prefix {
                        Some(prefix) => EnvConfigProvider::new(prefix),
                        None => EnvConfigProvider::default(),
                    };
                    builder = builder.with_provider(env_provider);
                }

                for provider in self.providers {
                    builder = builder.with_shared_provider(provider);
                }
                builder.build()
            }
        };

        match config.get::<LoggingConfig>("logging") {
            Ok(Some(logging_config)) => logging::init_with_config(&logging_config),
            Ok(None) => logging::init_with_config(&LoggingConfig::default()),
            Err(e) => {
                logging::init_with_config(&LoggingConfig::default());
                warn_fmt!("Startup", "Ignoring invalid logging configuration: {}", e);
            }
        }

        let settings = PanelSettings::load(&config)?;
        let server = ServerSettings::load(&config)?;
        info_fmt!("Startup", "Managing documents under {}", settings.config_path.display());

        Panel::from_settings(config, settings, server)
    }
}

/// Every manager, constructed once, sharing the same base directory.
#[derive(Debug, Clone)]
pub struct Panel {
    config: Arc<Config>,
    settings: PanelSettings,
    server: ServerSettings,
    http: HttpManager,
    transport: TcpUdpManager,
    resolvers: ResolverManager,
    certificates: ManualCertificateManager,
    status: ProxyApiClient,
}

impl Panel {
    pub fn loader() -> PanelLoader {
        PanelLoader::new()
    }

    fn from_settings(
        config: Config,
        settings: PanelSettings,
        server: ServerSettings,
    ) -> Result<Self, LoaderError> {
        let base: &Path = &settings.config_path;

        let http = HttpManager::new(base)?;
        let transport = TcpUdpManager::new(base)?;
        let resolvers = ResolverManager::new(base)?;
        let certificates = ManualCertificateManager::new(base, settings.certs_mount.as_str())?;
        let status = ProxyApiClient::new(&settings.api_url, settings.api_timeout())?;

        Ok(Self {
            config: Arc::new(config),
            settings,
            server,
            http,
            transport,
            resolvers,
            certificates,
            status,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    pub fn server_settings(&self) -> &ServerSettings {
        &self.server
    }

    pub fn http(&self) -> &HttpManager {
        &self.http
    }

    pub fn transport(&self) -> &TcpUdpManager {
        &self.transport
    }

    pub fn resolvers(&self) -> &ResolverManager {
        &self.resolvers
    }

    pub fn certificates(&self) -> &ManualCertificateManager {
        &self.certificates
    }

    pub fn status(&self) -> &ProxyApiClient {
        &self.status
    }

    /// Every file the panel writes, for startup diagnostics.
    pub fn document_paths(&self) -> Vec<&Path> {
        vec![
            self.http.document_path(),
            self.transport.document_path(),
            self.resolvers.document_path(),
            self.certificates.document_path(),
        ]
    }

    /// Serve `/health` and `/status` on `server.listen` until shutdown.
    pub async fn serve(&self) -> Result<(), LoaderError> {
        let server = StatusServer::bind(&self.server.listen, self.status.clone()).await?;
        server.serve().await?;
        Ok(())
    }
}
