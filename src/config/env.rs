// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable-based configuration provider.
//!
//! `TPM_TRAEFIK__API_URL` becomes the key `traefik.api_url`: the prefix is
//! stripped, the rest lower-cased, and `__` separates nesting levels so that
//! single underscores survive inside key names.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::env;

use super::ConfigError;
use super::ConfigProvider;

pub const DEFAULT_PREFIX: &str = "TPM_";

const NESTING_SEPARATOR: &str = "__";

#[derive(Debug)]
pub struct EnvConfigProvider {
    prefix: String,
    /// Matching variables by config key, captured at construction.
    cache: HashMap<String, String>,
}

impl EnvConfigProvider {
    pub fn new(prefix: &str) -> Self {
        let mut provider = Self {
            prefix: prefix.to_string(),
            cache: HashMap::new(),
        };
        provider.refresh_cache();
        provider
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn refresh_cache(&mut self) {
        self.cache.clear();

        for (key, value) in env::vars() {
            let Some(rest) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let config_key = rest.to_lowercase().replace(NESTING_SEPARATOR, ".");
            self.cache.insert(config_key, value);
        }
    }

    /// JSON first, then bool, integer and float, falling back to a string.
    fn parse_value_to_json(&self, value: &str) -> Result<Value, ConfigError> {
        if let Ok(json_value) = serde_json::from_str(value) {
            return Ok(json_value);
        }

        if value.eq_ignore_ascii_case("true") {
            return Ok(json!(true));
        } else if value.eq_ignore_ascii_case("false") {
            return Ok(json!(false));
        }

        if let Ok(int_val) = value.parse::<i64>() {
            return Ok(json!(int_val));
        }

        if let Ok(float_val) = value.parse::<f64>() {
            return Ok(json!(float_val));
        }

        Ok(json!(value))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        match self.cache.get(key) {
            Some(value) => self.parse_value_to_json(value).map(Some),
            None => Ok(None),
        }
    }

    fn has(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "env"
    }
}
