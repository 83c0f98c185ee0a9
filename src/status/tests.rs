// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

fn overview(http: u64, tcp: u64, udp: u64) -> Value {
    json!({
        "http": { "routers": { "total": http, "warnings": 0, "errors": 0 } },
        "tcp": { "routers": { "total": tcp, "warnings": 0, "errors": 0 } },
        "udp": { "routers": { "total": udp, "warnings": 0, "errors": 0 } },
    })
}

#[test]
fn test_failed_ping_is_down() {
    let report = derive_status(
        Err(ProbeError::Unhealthy("starting".into())),
        &Value::Null,
        &overview(3, 0, 0),
    );

    assert_eq!(report.status, HealthState::Down);
    assert!(report.error.unwrap().contains("starting"));
    assert!(report.provider.is_none());
}

#[test]
fn test_non_ok_status_is_down() {
    let report = derive_status(Err(ProbeError::Status(503)), &Value::Null, &Value::Null);
    assert_eq!(report.status, HealthState::Down);
    assert_eq!(report.error.as_deref(), Some("unexpected HTTP status 503"));
}

#[test]
fn test_provider_error_is_broken() {
    let rawdata = json!({
        "providers": {
            "docker": {},
            "file": { "error": "yaml: line 3: did not find expected key" }
        }
    });

    let report = derive_status(Ok(()), &rawdata, &overview(2, 0, 0));

    assert_eq!(report.status, HealthState::Broken);
    assert_eq!(report.provider.as_deref(), Some("file"));
    assert_eq!(report.error.as_deref(), Some("yaml: line 3: did not find expected key"));
}

#[test]
fn test_blank_provider_errors_are_ignored() {
    let rawdata = json!({
        "providers": {
            "file": { "error": "" },
            "docker": { "error": null }
        }
    });

    let report = derive_status(Ok(()), &rawdata, &overview(1, 0, 0));
    assert_eq!(report.status, HealthState::Running);
}

#[test]
fn test_structured_provider_error_is_stringified() {
    let rawdata = json!({ "providers": { "kv": { "error": { "code": 7 } } } });

    let report = derive_status(Ok(()), &rawdata, &Value::Null);
    assert_eq!(report.status, HealthState::Broken);
    assert_eq!(report.error.as_deref(), Some(r#"{"code":7}"#));
}

#[test]
fn test_no_routers_is_empty() {
    let report = derive_status(Ok(()), &json!({}), &overview(0, 0, 0));
    assert_eq!(report.status, HealthState::Empty);
    assert!(report.details.is_none());
}

#[test]
fn test_missing_overview_is_empty() {
    let report = derive_status(Ok(()), &Value::Null, &Value::Null);
    assert_eq!(report.status, HealthState::Empty);
}

#[test]
fn test_routers_are_counted_across_sections() {
    let report = derive_status(Ok(()), &json!({}), &overview(0, 2, 1));

    assert_eq!(report.status, HealthState::Running);
    assert_eq!(report.details, Some(json!({ "routers": 3 })));
}

#[test]
fn test_sections_without_counters_count_as_zero() {
    let overview = json!({ "http": { "services": { "total": 4 } }, "udp": {} });

    let report = derive_status(Ok(()), &json!({}), &overview);
    assert_eq!(report.status, HealthState::Empty);
}

#[test]
fn test_broken_wins_over_empty() {
    let rawdata = json!({ "providers": { "file": { "error": "boom" } } });

    let report = derive_status(Ok(()), &rawdata, &overview(0, 0, 0));
    assert_eq!(report.status, HealthState::Broken);
}

#[test]
fn test_report_serialization() {
    let report = derive_status(Ok(()), &json!({}), &overview(1, 0, 0));
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["status"], "RUNNING");
    assert_eq!(value["details"]["routers"], 1);
    assert!(value.get("provider").is_none());
    assert!(value.get("error").is_none());
    assert!(value["checked_at"].is_string());
}

#[test]
fn test_health_state_display() {
    assert_eq!(HealthState::Down.to_string(), "DOWN");
    assert_eq!(HealthState::Empty.to_string(), "EMPTY");
    assert_eq!(ApiSection::Udp.to_string(), "udp");
}

#[test]
fn test_client_trims_trailing_slash() {
    let client = ProxyApiClient::new("http://traefik:8080/", std::time::Duration::from_secs(1)).unwrap();
    assert_eq!(client.base_url(), "http://traefik:8080");
}
