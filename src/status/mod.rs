// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live status of the proxy, read from its introspection API.
//!
//! The health state is derived in three steps:
//!
//! 1. `GET /ping` must answer `200 OK` with body `OK`, otherwise **DOWN**.
//! 2. `GET /api/rawdata`: any provider carrying an `error` makes it **BROKEN**.
//! 3. `GET /api/overview`: no active router in any section makes it **EMPTY**.
//!
//! Anything else is **RUNNING**. An unreachable proxy is a `DOWN` report,
//! never an error.

mod client;

#[cfg(test)]
mod tests;

pub use client::{ApiSection, ProbeError, ProxyApiClient};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Health of the proxy as shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Down,
    Broken,
    Empty,
    Running,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Down => write!(f, "DOWN"),
            HealthState::Broken => write!(f, "BROKEN"),
            HealthState::Empty => write!(f, "EMPTY"),
            HealthState::Running => write!(f, "RUNNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: HealthState,

    /// Provider responsible for a `BROKEN` state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    pub checked_at: DateTime<Utc>,
}

impl StatusReport {
    fn new(status: HealthState) -> Self {
        Self {
            status,
            provider: None,
            error: None,
            details: None,
            checked_at: Utc::now(),
        }
    }
}

/// Compute the health state from already fetched probe results.
///
/// `rawdata` and `overview` may be `Value::Null` when they could not be
/// fetched; that is treated as "no provider errors" and "no routers".
pub fn derive_status(ping: Result<(), ProbeError>, rawdata: &Value, overview: &Value) -> StatusReport {
    if let Err(e) = ping {
        let mut report = StatusReport::new(HealthState::Down);
        report.error = Some(e.to_string());
        return report;
    }

    if let Some(providers) = rawdata.get("providers").and_then(Value::as_object) {
        for (name, provider) in providers {
            let Some(error) = provider.get("error").filter(|e| is_set(e)) else {
                continue;
            };
            let mut report = StatusReport::new(HealthState::Broken);
            report.provider = Some(name.clone());
            report.error = Some(match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            });
            return report;
        }
    }

    let routers = active_routers(overview);
    if routers == 0 {
        return StatusReport::new(HealthState::Empty);
    }

    let mut report = StatusReport::new(HealthState::Running);
    report.details = Some(json!({ "routers": routers }));
    report
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

/// `routers.total` summed over every section.
fn active_routers(overview: &Value) -> u64 {
    ApiSection::ALL
        .iter()
        .map(|section| match overview.get(section.as_str()).and_then(|s| s.get("routers")) {
            Some(Value::Object(counts)) => counts.get("total").and_then(Value::as_u64).unwrap_or(0),
            Some(Value::Number(total)) => total.as_u64().unwrap_or(0),
            Some(Value::Array(routers)) => routers.len() as u64,
            _ => 0,
        })
        .sum()
}
