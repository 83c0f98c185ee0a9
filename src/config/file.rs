// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-based configuration provider implementation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;
use super::ConfigProvider;

/// Supported file formats for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// JSON format (.json)
    Json,
    /// TOML format (.toml)
    Toml,
    /// YAML format (.yaml, .yml)
    Yaml,
}

impl FileFormat {
    /// Detect the file format from the file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| {
            let ext_str = ext.to_string_lossy().to_lowercase();
            match ext_str.as_str() {
                "json" => Some(FileFormat::Json),
                "toml" => Some(FileFormat::Toml),
                "yaml" | "yml" => Some(FileFormat::Yaml),
                _ => None,
            }
        })
    }
}

/// Configuration read once from a JSON, TOML or YAML file.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    format: FileFormat,
    data: HashMap<String, serde_json::Value>,
}

impl FileConfigProvider {
    /// Format is chosen by extension. The root must be a mapping.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let path_buf = PathBuf::from(path);
        let format = FileFormat::from_extension(&path_buf)
            .ok_or_else(|| ConfigError::provider_error("file", "unsupported file format"))?;

        let data = Self::read_file(&path_buf, format)?;

        Ok(Self {
            path: path_buf,
            format,
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn read_file(
        path: &Path,
        format: FileFormat,
    ) -> Result<HashMap<String, serde_json::Value>, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::provider_error("file", format!("failed to read file: {e}"))
        })?;

        match format {
            FileFormat::Json => {
                let json_value: serde_json::Value = serde_json::from_str(&content)
                    .map_err(|e| ConfigError::provider_error("file", format!("invalid JSON: {e}")))?;
                Self::into_root(json_value)
            }
            FileFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(&content).map_err(|e| {
                    ConfigError::provider_error("file", format!("invalid TOML: {e}"))
                })?;

                let json_value = serde_json::to_value(toml_value).map_err(|e| {
                    ConfigError::provider_error("file", format!("failed to convert TOML: {e}"))
                })?;
                Self::into_root(json_value)
            }
            FileFormat::Yaml => {
                let yaml_value: serde_yaml::Value =
                    serde_yaml::from_str(&content).map_err(|e| {
                        ConfigError::provider_error("file", format!("invalid YAML: {e}"))
                    })?;

                let json_value = serde_json::to_value(yaml_value).map_err(|e| {
                    ConfigError::provider_error("file", format!("failed to convert YAML: {e}"))
                })?;
                Self::into_root(json_value)
            }
        }
    }

    fn into_root(
        value: serde_json::Value,
    ) -> Result<HashMap<String, serde_json::Value>, ConfigError> {
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(ConfigError::provider_error(
                "file",
                "root configuration must be an object",
            )),
        }
    }

    /// Walk a dot-separated key path.
    fn get_nested_value(&self, key_path: &str) -> Option<&serde_json::Value> {
        let mut parts = key_path.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }
}

impl ConfigProvider for FileConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.get_nested_value(key).is_some()
    }

    fn provider_name(&self) -> &str {
        "file"
    }

    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>, ConfigError> {
        match self.get_nested_value(key) {
            Some(value) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigProviderExt;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension(Path::new("tpm.toml")), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension(Path::new("tpm.YML")), Some(FileFormat::Yaml));
        assert_eq!(FileFormat::from_extension(Path::new("tpm.json")), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension(Path::new("tpm.ini")), None);
        assert_eq!(FileFormat::from_extension(Path::new("tpm")), None);
    }

    #[test]
    fn test_toml_nested_lookup() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "tpm.toml",
            "[traefik]\nconfig_path = \"/data\"\napi_timeout_secs = 3\n",
        );

        let provider = FileConfigProvider::new(&path).unwrap();
        assert_eq!(provider.format(), FileFormat::Toml);
        assert!(provider.has("traefik"));
        assert!(provider.has("traefik.config_path"));
        assert!(!provider.has("traefik.missing"));
        assert_eq!(provider.get::<u64>("traefik.api_timeout_secs").unwrap(), Some(3));
    }

    #[test]
    fn test_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = write(&dir, "tpm.yaml", "server:\n  listen: 0.0.0.0:9000\n");
        let json = write(&dir, "tpm.json", r#"{"server": {"listen": "[::]:9000"}}"#);

        let yaml = FileConfigProvider::new(&yaml).unwrap();
        assert_eq!(yaml.get::<String>("server.listen").unwrap().unwrap(), "0.0.0.0:9000");
        let json = FileConfigProvider::new(&json).unwrap();
        assert_eq!(json.get::<String>("server.listen").unwrap().unwrap(), "[::]:9000");
    }

    #[test]
    fn test_root_must_be_a_mapping() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "list.yaml", "- a\n- b\n");

        let err = FileConfigProvider::new(&path).unwrap_err();
        assert!(err.to_string().contains("root configuration must be an object"));
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        let err = FileConfigProvider::new("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ProviderError { .. }));

        let err = FileConfigProvider::new("settings.ini").unwrap_err();
        assert!(err.to_string().contains("unsupported file format"));
    }
}
