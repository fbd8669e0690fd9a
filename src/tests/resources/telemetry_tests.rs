use crate::core::domain::model::telemetry::BandPosition;
use crate::tests::settled;
use crate::{BGreenClient, ClientConfig, PlacementSummary, SnapshotMemo};
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn placement() -> serde_json::Value {
    serde_json::json!({
        "data_center": "dc-istanbul",
        "id": 1,
        "physical_machines": [
            {
                "name": "pm1",
                "power_consumption": 100.0,
                "status": "open",
                "vms": {
                    "active": [{"name": "vmA", "power": 20.5, "status": "blocked",
                                "confg": {"cpu": 2, "ram": 4, "disk": 40}}],
                    "inactive": []
                }
            },
            {
                "name": "pm2",
                "power_consumption": 0,
                "status": "open",
                "vms": {"active": [], "inactive": [{"name": "vmB", "power": 0, "status": "open"}]}
            }
        ]
    })
}

#[tokio::test]
async fn test_placement_summary() {
    let mock_server = MockServer::start().await;
    let client = crate::tests::create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/prom/get_chart_data/vm_placement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(placement()))
        .mount(&mock_server)
        .await;

    let hook = client.watch_placement();
    settled(&hook).await;
    let snapshot = hook.latest().unwrap();

    let mut memo = SnapshotMemo::new(PlacementSummary::from_placement);
    let summary = memo.get(&snapshot);
    assert_eq!(summary.counts.active_compute_count, 1);
    assert_eq!(summary.counts.total_compute_count, 2);
    assert_eq!(summary.counts.active_vm_count, 1);
    assert_eq!(summary.counts.inactive_vm_count, 1);
    assert_eq!(summary.blocked.blocked_vms, 1);
    assert_eq!(summary.series.vm_power, [20.5, 0.0]);
    assert_eq!(summary.total_power, 100.0);

    // a refetch replaces the snapshot, so the summary is derived again
    hook.refetch().await;
    let next = hook.latest().unwrap();
    assert!(!Arc::ptr_eq(&snapshot, &next));
    assert!(!Arc::ptr_eq(&summary, &memo.get(&next)));
}

#[tokio::test]
async fn test_invalid_placement_keeps_previous() {
    let mock_server = MockServer::start().await;
    let client = crate::tests::create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/prom/get_chart_data/vm_placement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(placement()))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prom/get_chart_data/vm_placement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "physical_machines": [{"name": "pm1", "power_consumption": -4.0}]
        })))
        .mount(&mock_server)
        .await;

    let hook = client.watch_placement();
    settled(&hook).await;
    hook.refetch().await;

    let snapshot = hook.latest().unwrap();
    assert_eq!(snapshot.physical_machines.len(), 2);
    assert_eq!(snapshot.data_center.as_deref(), Some("dc-istanbul"));
}

#[tokio::test]
async fn test_maintenance_history() {
    let mock_server = MockServer::start().await;
    let client = BGreenClient::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .history_len(2)
        .build()
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/prom/get_chart_data/maintenance/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "now_timestamp": "2025-03-01 10:00:00",
                    "future_timestamp": "2025-03-01 10:15:00",
                    "power": "410.5",
                    "power_future_15min": "415.0",
                    "positive_3p": "422.8",
                    "negative_3p": "398.2",
                    "positive_7p": "439.2",
                    "negative_7p": "381.8",
                    "flag": "normal"
                },
                {
                    "now_timestamp": "2025-03-01 10:05:00",
                    "future_timestamp": "2025-03-01 10:20:00",
                    "power": "412.0",
                    "power_future_15min": "470.0",
                    "positive_3p": "424.4",
                    "negative_3p": "399.6",
                    "positive_7p": "440.8",
                    "negative_7p": "383.2",
                    "flag": "maintenance"
                }
            ]
        })))
        .expect(1..)
        .mount(&mock_server)
        .await;

    let hook = client.watch_maintenance();
    settled(&hook).await;
    let series = hook.latest().unwrap();
    assert_eq!(series.current_flag(), Some("maintenance"));
    assert_eq!(series.data[0].prediction_band(), BandPosition::Within3);
    assert_eq!(series.data[1].prediction_band(), BandPosition::Outside);
    assert_eq!(series.tail(1)[0].power, 412.0);
}

#[tokio::test]
async fn test_temperature_history() {
    let mock_server = MockServer::start().await;
    let client = crate::tests::create_test_client(&mock_server);
    let rows = ClientConfig::default().history_len;

    Mock::given(method("GET"))
        .and(path(format!("/prom/get_chart_data/temperature/{}", rows)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "now_timestamp": "2025-03-01 10:00:00",
                "future_timestamp": "2025-03-01 10:15:00",
                "power": "380",
                "power_future_15min": "392.5",
                "env_temp_cur": "24.1",
                "env_temp_15min": "24.6"
            }]
        })))
        .mount(&mock_server)
        .await;

    let hook = client.watch_temperature();
    settled(&hook).await;
    let latest = hook.latest().unwrap();
    let row = latest.latest().unwrap();
    assert_eq!(row.env_temp_15min, 24.6);
    assert_eq!(row.power, 380.0);
}

#[tokio::test]
async fn test_vm_details_lookup() {
    let mock_server = MockServer::start().await;
    let client = crate::tests::create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/prom/vm_mac_details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "res": {
                "3f1c": {
                    "name": "web-1",
                    "original_name": "web-1",
                    "host": "compute2",
                    "ip": "10.0.1.4",
                    "vcpus": 2,
                    "ram": 4096,
                    "disk": 40,
                    "ephemeral": 0,
                    "swap": 0,
                    "extra_specs": {"hw:cpu_policy": "dedicated"}
                }
            }
        })))
        .mount(&mock_server)
        .await;

    let hook = client.watch_vm_details();
    settled(&hook).await;
    let index = hook.latest().unwrap();
    let (id, details) = index.by_ip("10.0.1.4").unwrap();
    assert_eq!(id, "3f1c");
    assert_eq!(details.host, "compute2");
    assert_eq!(details.extra_specs["hw:cpu_policy"], "dedicated");
}
