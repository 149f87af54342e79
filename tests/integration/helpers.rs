//! Helper functions for integration tests

use std::time::Duration;

use archiver_status::{
    MetricGroup, MetricKey,
    config::{MonitorConfig, Target},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const INSTANCE_PATH: &str = "/mgmt/bpl/getInstanceMetrics";
pub const APPLIANCE_PATH: &str = "/mgmt/bpl/getApplianceMetricsForAppliance";
pub const STORAGE_PATH: &str = "/mgmt/bpl/getStorageMetricsForAppliance";

pub fn create_test_target(identity: &str, base_url: &str) -> Target {
    Target::new(identity, base_url).unwrap()
}

/// Config that never polls on its own after the first cycle
pub fn create_test_config(targets: Vec<Target>) -> MonitorConfig {
    MonitorConfig {
        targets,
        request_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_secs(3600),
        prefix: String::new(),
    }
}

pub fn key(identity: &str, group: MetricGroup, field: &'static str) -> MetricKey {
    MetricKey::new(identity, group, field)
}

/// Base URL on which nothing is listening
pub fn unreachable_url() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{port}")
}

pub fn create_instance_json(identity: &str, pv_count: u32) -> serde_json::Value {
    serde_json::json!({
        "instance": identity,
        "status": "Normal",
        "MGMT_uptime": "2 days",
        "pvCount": pv_count.to_string(),
        "connectedPVCount": (pv_count - 5).to_string(),
        "disconnectedPVCount": "5",
        "dataRateGBPerDay": "1.23"
    })
}

pub fn create_appliance_json(paused: u32) -> serde_json::Value {
    serde_json::json!([
        { "name": "Engine write thread", "value": "0.12" },
        { "name": "Paused PV count", "value": paused.to_string() },
        { "name": "Capacity planning metrics", "value": "n/a" }
    ])
}

pub fn create_storage_json() -> serde_json::Value {
    serde_json::json!([
        { "name": "STS", "total_space": "1,234.50", "available_space": "617.25", "available_space_percent": "50.00" },
        { "name": "MTS", "total_space": "20,000.00", "available_space": "5,000.00", "available_space_percent": "25.00" },
        { "name": "LTS", "total_space": "1,000,000.00", "available_space": "100,000.00", "available_space_percent": "10.00" }
    ])
}

/// Mount healthy answers for all three endpoints of every listed appliance
///
/// The instance list is shared, so it lists every appliance.
pub async fn mount_healthy_appliances(mock_server: &MockServer, identities: &[(&str, u32)]) {
    let instances: Vec<_> = identities
        .iter()
        .map(|(identity, pv_count)| create_instance_json(identity, *pv_count))
        .collect();

    Mock::given(method("GET"))
        .and(path(INSTANCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances))
        .mount(mock_server)
        .await;

    for (identity, pv_count) in identities {
        Mock::given(method("GET"))
            .and(path(APPLIANCE_PATH))
            .and(query_param("appliance", *identity))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_appliance_json(
                pv_count / 10,
            )))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(STORAGE_PATH))
            .and(query_param("appliance", *identity))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_storage_json()))
            .mount(mock_server)
            .await;
    }
}
