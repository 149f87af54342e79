//! End-to-end tests: mock appliance → pollers → store → exported PVs

use archiver_status::{
    MetricGroup, MetricValue, MonitorSupervisor, Quality, Value,
    export::{PvNaming, export_snapshot},
};
use pretty_assertions::assert_eq;
use wiremock::MockServer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::*;

async fn poll_all(supervisor: &MonitorSupervisor) {
    for poller in supervisor.pollers() {
        poller.poll_now().await.unwrap();
    }
}

#[tokio::test]
async fn test_single_appliance_instance_metrics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(INSTANCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "instance": "appliance0",
            "status": "Normal",
            "MGMT_uptime": "2 days",
            "pvCount": "100",
            "connectedPVCount": "95",
            "disconnectedPVCount": "5",
            "dataRateGBPerDay": "1.23"
        }])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(vec![create_test_target(
        "appliance0",
        &mock_server.uri(),
    )]);
    let supervisor = MonitorSupervisor::start_http(&config).unwrap();

    supervisor
        .poller("appliance0", MetricGroup::Instance)
        .unwrap()
        .poll_now()
        .await
        .unwrap();

    let exported = export_snapshot(supervisor.store(), &PvNaming::from_config(&config));

    assert_eq!(
        exported["status"],
        MetricValue::good(Value::String("Normal".into()))
    );
    assert_eq!(
        exported["MGMT_uptime"],
        MetricValue::good(Value::String("2 days".into()))
    );
    assert_eq!(exported["pvCount"], MetricValue::good(Value::Integer(100)));
    assert_eq!(
        exported["connectedPVCount"],
        MetricValue::good(Value::Integer(95))
    );
    assert_eq!(
        exported["disconnectedPVCount"],
        MetricValue::good(Value::Integer(5))
    );
    assert_eq!(
        exported["dataRateGBPerDay"],
        MetricValue::good(Value::Float(1.23))
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_all_groups_healthy() {
    let mock_server = MockServer::start().await;
    mount_healthy_appliances(&mock_server, &[("appliance0", 100)]).await;

    let config = create_test_config(vec![create_test_target(
        "appliance0",
        &mock_server.uri(),
    )]);
    let supervisor = MonitorSupervisor::start_http(&config).unwrap();

    poll_all(&supervisor).await;

    let store = supervisor.store();
    for (key, value) in store.snapshot() {
        assert_eq!(value.quality, Quality::Good, "{key} should be good");
    }
    assert_eq!(
        store.get(&key("appliance0", MetricGroup::Appliance, "pausedPVCount")),
        Some(MetricValue::good(Value::Integer(10)))
    );
    assert_eq!(
        store.get(&key("appliance0", MetricGroup::Storage, "sts_total_space")),
        Some(MetricValue::good(Value::Float(1234.50)))
    );
    assert_eq!(
        store.get(&key("appliance0", MetricGroup::Storage, "lts_available_space")),
        Some(MetricValue::good(Value::Float(100_000.0)))
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_repeated_identical_responses_are_idempotent() {
    let mock_server = MockServer::start().await;
    mount_healthy_appliances(&mock_server, &[("appliance0", 100)]).await;

    let config = create_test_config(vec![create_test_target(
        "appliance0",
        &mock_server.uri(),
    )]);
    let supervisor = MonitorSupervisor::start_http(&config).unwrap();

    poll_all(&supervisor).await;
    let first = supervisor.store().snapshot();

    poll_all(&supervisor).await;
    let second = supervisor.store().snapshot();

    assert_eq!(first, second);
    assert!(second.values().all(MetricValue::is_good));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_cluster_names_are_qualified_by_identity() {
    let mock_server = MockServer::start().await;
    mount_healthy_appliances(&mock_server, &[("appliance0", 100), ("appliance1", 200)]).await;

    let config = create_test_config(vec![
        create_test_target("appliance0", &mock_server.uri()),
        create_test_target("appliance1", &mock_server.uri()),
    ]);
    let supervisor = MonitorSupervisor::start_http(&config).unwrap();

    poll_all(&supervisor).await;

    let exported = export_snapshot(supervisor.store(), &PvNaming::from_config(&config));

    assert_eq!(exported.len(), 32);
    assert_eq!(
        exported["appliance0:pvCount"],
        MetricValue::good(Value::Integer(100))
    );
    assert_eq!(
        exported["appliance1:pvCount"],
        MetricValue::good(Value::Integer(200))
    );
    assert_eq!(
        exported["appliance1:pausedPVCount"],
        MetricValue::good(Value::Integer(20))
    );
    assert!(!exported.contains_key("pvCount"));
    assert!(exported.keys().all(|name| name.starts_with("appliance")));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_pollers_repeat_on_their_own() {
    let mock_server = MockServer::start().await;
    mount_healthy_appliances(&mock_server, &[("appliance0", 100)]).await;

    let mut config = create_test_config(vec![create_test_target(
        "appliance0",
        &mock_server.uri(),
    )]);
    config.poll_interval = std::time::Duration::from_millis(100);
    let supervisor = MonitorSupervisor::start_http(&config).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(550)).await;

    let requests = mock_server.received_requests().await.unwrap();
    for endpoint in [INSTANCE_PATH, APPLIANCE_PATH, STORAGE_PATH] {
        let count = requests
            .iter()
            .filter(|request| request.url.path() == endpoint)
            .count();
        assert!(count >= 3, "{endpoint} polled {count} times");
    }
    assert!(supervisor.store().snapshot().values().all(MetricValue::is_good));

    supervisor.shutdown().await;
}
