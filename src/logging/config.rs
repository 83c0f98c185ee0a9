// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for logging, read from the `logging` key.

use crate::logging::structured::{LogFormat, LoggerConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Use slog instead of env_logger
    #[serde(default)]
    pub structured: bool,

    /// `terminal` or `json`
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_true")]
    pub include_location: bool,

    /// Static fields to include in all structured records
    #[serde(default)]
    pub static_fields: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "terminal".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            structured: false,
            format: default_format(),
            level: default_level(),
            include_location: true,
            static_fields: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Level for the `log` facade. Unknown names fall back to info.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "warn" | "warning" => LevelFilter::Warn,
            "error" | "critical" => LevelFilter::Error,
            _ => LevelFilter::Info,
        }
    }

    pub fn to_logger_config(&self) -> LoggerConfig {
        let mut static_fields: Vec<(String, String)> = self
            .static_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        static_fields.sort();

        LoggerConfig {
            format: match self.format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Terminal,
            },
            level: match self.level.to_lowercase().as_str() {
                "trace" => slog::Level::Trace,
                "debug" => slog::Level::Debug,
                "info" => slog::Level::Info,
                "warn" | "warning" => slog::Level::Warning,
                "error" => slog::Level::Error,
                "critical" => slog::Level::Critical,
                _ => slog::Level::Info,
            },
            include_location: self.include_location,
            static_fields,
        }
    }
}
