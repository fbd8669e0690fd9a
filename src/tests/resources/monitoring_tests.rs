use crate::core::domain::model::{
    monitoring::{MonitoringService, RunState},
    monitoring_config::{MonitoringConfig, MonitoringSettingsForm, SettingField},
};
use crate::tests::{create_test_client, settled};
use crate::{BGreenError, WeightKey, WeightVector, monitoring_counts};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

fn status(migration: bool, environmental: bool, preventive: bool) -> serde_json::Value {
    serde_json::json!({
        "statuses": {
            "migration": {"is_running": migration},
            "environmental": {"is_running": environmental},
            "preventive": {"is_running": preventive}
        }
    })
}

async fn mount_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/prom/monitoring/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn expect_no_start(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/prom/monitoring/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_start_monitoring_sends_config() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status(&mock_server, status(false, false, false)).await;

    let mut form = MonitoringSettingsForm::default();
    form.apply(SettingField::EnvSteps, "12").unwrap();
    let config = form.build(&["10.0.0.9".to_string()]);

    Mock::given(method("POST"))
        .and(path("/prom/monitoring/start"))
        .and(body_json(serde_json::json!({
            "migration": {
                "script_time_unit": "5",
                "estimation_method": "indirect",
                "model_type": "mul_reg",
                "migration_method": "migration_advices_la",
                "operation_mode": "auto",
                "block_list": ["10.0.0.9"]
            },
            "environmental": {"number_of_steps": "12", "script_time_unit": "1", "model_type": "lstm"},
            "preventive": {"number_of_steps": "3", "script_time_unit": "1", "model_type": "lstm"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sent = client
        .start_monitoring(&config, &WeightVector::default())
        .await
        .unwrap();
    assert_eq!(sent, config);
    assert!(client.last_known_status().unwrap().all_stopped());
}

#[tokio::test]
async fn test_start_refused_for_invalid_weights() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    expect_no_start(&mock_server).await;

    let mut weights = WeightVector::default();
    weights.set_direct(WeightKey::Energy, 40.0);
    assert!(!weights.is_valid());

    let result = client
        .start_monitoring(&MonitoringConfig::default(), &weights)
        .await;
    assert!(matches!(result, Err(BGreenError::Validation(_))));
}

#[tokio::test]
async fn test_start_refused_for_invalid_config() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    expect_no_start(&mock_server).await;

    let mut config = MonitoringConfig::default();
    config.environmental.script_time_unit = "7".to_string();

    let err = client
        .start_monitoring(&config, &WeightVector::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BGreenError::Validation(_)));
}

#[tokio::test]
async fn test_start_refused_while_running() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status(&mock_server, status(false, true, false)).await;
    expect_no_start(&mock_server).await;

    let err = client
        .start_monitoring(&MonitoringConfig::default(), &WeightVector::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BGreenError::AlreadyRunning));
    assert_eq!(err.user_message(), "Monitoring is already running");
}

#[tokio::test]
async fn test_start_falls_back_to_last_known_status() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/prom/monitoring/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status(true, true, true)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prom/monitoring/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    expect_no_start(&mock_server).await;

    assert!(client.monitoring_status().await.unwrap().all_running());
    let err = client
        .start_monitoring(&MonitoringConfig::default(), &WeightVector::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BGreenError::AlreadyRunning));
}

async fn mount_status_once(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/prom/monitoring/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_status_failure(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/prom/monitoring/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;
}

async fn mount_write(server: &MockServer, endpoint: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200))
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_start_monitoring_refreshes_status() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status_once(&mock_server, status(false, false, false)).await;
    mount_status(&mock_server, status(true, true, true)).await;
    mount_write(&mock_server, "/prom/monitoring/start", 1).await;

    client
        .start_monitoring(&MonitoringConfig::default(), &WeightVector::default())
        .await
        .unwrap();
    assert!(client.last_known_status().unwrap().any_running());
}

#[tokio::test]
async fn test_start_counts_as_running_when_refresh_fails() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status_once(&mock_server, status(false, false, false)).await;
    mount_status_failure(&mock_server).await;
    mount_write(&mock_server, "/prom/monitoring/start", 1).await;

    client
        .start_monitoring(&MonitoringConfig::default(), &WeightVector::default())
        .await
        .unwrap();
    assert!(client.last_known_status().unwrap().all_running());

    let err = client
        .start_monitoring(&MonitoringConfig::default(), &WeightVector::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BGreenError::AlreadyRunning));
}

#[tokio::test]
async fn test_stop_monitoring_refreshes_status() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status_once(&mock_server, status(true, false, false)).await;
    mount_status(&mock_server, status(false, false, false)).await;
    mount_write(&mock_server, "/prom/monitoring/stop", 1).await;

    assert!(client.monitoring_status().await.unwrap().any_running());
    client.stop_monitoring().await.unwrap();
    assert!(client.last_known_status().unwrap().all_stopped());
}

#[tokio::test]
async fn test_stop_monitoring_forgets_status_when_refresh_fails() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status_once(&mock_server, status(true, false, false)).await;
    mount_status_failure(&mock_server).await;
    mount_write(&mock_server, "/prom/monitoring/stop", 1).await;

    client.monitoring_status().await.unwrap();
    assert!(client.last_known_status().is_some());
    client.stop_monitoring().await.unwrap();
    assert!(client.last_known_status().is_none());
}

#[tokio::test]
async fn test_slow_status_does_not_replace_newer_one() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/prom/monitoring/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status(true, true, true))
                .set_delay(Duration::from_millis(400)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_status(&mock_server, status(false, false, false)).await;

    let hook = client.watch_monitoring_status();
    // the first tick waits on the slow answer while the refetch overtakes it
    tokio::time::sleep(Duration::from_millis(100)).await;
    hook.refetch().await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(hook.latest().unwrap().all_stopped());
    assert!(client.last_known_status().unwrap().all_stopped());
}

#[tokio::test]
async fn test_status_hook_handles_missing_flags() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_status(
        &mock_server,
        serde_json::json!({
            "statuses": {
                "migration": {"is_running": false},
                "environmental": {"is_running": null}
            }
        }),
    )
    .await;

    let hook = client.watch_monitoring_status();
    settled(&hook).await;

    let status = hook.latest().unwrap();
    assert_eq!(status.state(MonitoringService::Migration), RunState::Stopped);
    assert_eq!(status.state(MonitoringService::Environmental), RunState::Unknown);
    assert_eq!(status.state(MonitoringService::Preventive), RunState::Unknown);
    assert!(!status.any_running());
    assert!(!status.all_stopped());
    // the hook feeds the start guard
    assert_eq!(client.last_known_status().as_ref(), Some(&*status));
}

#[tokio::test]
async fn test_monitoring_hook_tracks_stable_hosts() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    let hosts = |names: &[&str]| {
        let data: Vec<serde_json::Value> = names
            .iter()
            .map(|h| serde_json::json!({"host": h, "virtual_machines": [format!("{}-vm", h)]}))
            .collect();
        serde_json::json!({ "data": data })
    };
    for names in [&["A", "B"][..], &["A"][..]] {
        Mock::given(method("GET"))
            .and(path("/prom/monitoring"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hosts(names)))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/prom/monitoring"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hosts(&["A", "C"][..])))
        .mount(&mock_server)
        .await;

    let hook = client.watch_monitoring();
    settled(&hook).await;
    assert_eq!(hook.latest().unwrap().stable_hosts, ["A", "B"]);

    hook.refetch().await;
    assert_eq!(hook.latest().unwrap().stable_hosts, ["A"]);

    hook.refetch().await;
    let view = hook.latest().unwrap();
    assert_eq!(view.stable_hosts, ["A"]);
    assert_eq!(view.snapshot.host_names(), ["A", "C"]);
    assert_eq!(monitoring_counts(&view.snapshot).vm_count, 2);

    hook.refetch().await;
    assert_eq!(hook.latest().unwrap().stable_hosts, ["A", "C"]);
}

#[tokio::test]
async fn test_monitoring_hook_preserves_on_failure() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/prom/monitoring"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"host": "compute1", "virtual_machines": ["vm-1"]}],
            "optimization_space": {
                "compute1": {"host_ip": "10.0.0.1", "hosted_vms": {"vm-1": "10.0.1.1"}}
            }
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prom/monitoring"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let hook = client.watch_monitoring();
    settled(&hook).await;
    hook.refetch().await;

    let view = hook.latest().unwrap();
    assert_eq!(view.stable_hosts, ["compute1"]);
    let vms = view.snapshot.available_vms();
    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0].id, "compute1-vm-1");
    assert_eq!(hook.state().generation(), 2);
}
