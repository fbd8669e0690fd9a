use crate::BGreenError;
use crate::tests::{create_test_client, settled};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn gain_before() -> serde_json::Value {
    serde_json::json!({"cur_power": 1250.0, "prop_power": 1100.0, "prop_gain": 0.12})
}

fn advice() -> serde_json::Value {
    serde_json::json!({
        "vm-zeta": {"current_pm": "compute3", "proposed_pm": "compute1"},
        "vm-alpha": {"current_pm": "compute2", "proposed_pm": "compute2"}
    })
}

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_migration_advice_pair() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_get(&mock_server, "/prom/get_chart_data/gain_before", gain_before()).await;
    mount_get(&mock_server, "/prom/get_chart_data/migration", advice()).await;

    let hook = client.watch_migration_advice();
    settled(&hook).await;

    let outlook = hook.latest().unwrap();
    assert!(outlook.gain.is_improvement());
    assert_eq!(outlook.gain.current_power, 1250.0);
    let order: Vec<&str> = outlook.advice.iter().map(|(vm, _)| vm.as_str()).collect();
    assert_eq!(order, ["vm-zeta", "vm-alpha"]);
    assert_eq!(outlook.advice.moves().count(), 1);
}

#[tokio::test]
async fn test_half_failed_pair_is_cleared() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_get(&mock_server, "/prom/get_chart_data/gain_before", gain_before()).await;

    // first tick: advice succeeds, then the advice endpoint breaks
    Mock::given(method("GET"))
        .and(path("/prom/get_chart_data/migration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(advice()))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prom/get_chart_data/migration"))
        .respond_with(ResponseTemplate::new(500).set_body_string("advisor crashed"))
        .mount(&mock_server)
        .await;

    let hook = client.watch_migration_advice();
    settled(&hook).await;
    assert!(hook.latest().is_some());

    hook.refetch().await;
    assert!(hook.latest().is_none());
    assert!(!hook.is_loading());
}

#[tokio::test]
async fn test_malformed_half_fails_the_pair() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_get(&mock_server, "/prom/get_chart_data/gain_before", serde_json::json!({"cur_power": "n/a"})).await;
    mount_get(&mock_server, "/prom/get_chart_data/migration", advice()).await;

    let hook = client.watch_migration_advice();
    settled(&hook).await;
    assert!(hook.latest().is_none());
}

#[tokio::test]
async fn test_gain_after_verification() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    mount_get(
        &mock_server,
        "/prom/get_chart_data/gain_after",
        serde_json::json!({
            "past_power": 1250.0,
            "cur_power": 1105.0,
            "prop_power": 1100.0,
            "prop_ratio": 0.12,
            "actual_ratio": 0.116,
            "val_ratio": 0.966,
            "val_difference": 5.0
        }),
    )
    .await;

    let hook = client.watch_gain_after();
    settled(&hook).await;
    assert!(hook.latest().unwrap().is_verified());
}

#[tokio::test]
async fn test_approve_migration_streams_progress() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("POST"))
        .and(path("/prom/migration/decisions4"))
        .and(query_param("run_migration", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Migrating vm-zeta to compute1\nvm-zeta migrated\nMigration finished\n",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut progress = client.approve_migration().await.unwrap();
    assert_eq!(
        progress.next_line().await.unwrap().as_deref(),
        Some("Migrating vm-zeta to compute1")
    );
    let rest = progress.collect_lines(|_| {}).await.unwrap();
    assert_eq!(rest, ["vm-zeta migrated", "Migration finished"]);
}

#[tokio::test]
async fn test_decline_migration() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("POST"))
        .and(path("/prom/migration/decisions4"))
        .and(query_param("run_migration", "false"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    client.decline_migration().await.unwrap();
}

#[tokio::test]
async fn test_decision_failure_message() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("POST"))
        .and(path("/prom/migration/decisions4"))
        .respond_with(ResponseTemplate::new(409).set_body_string("no pending advice"))
        .mount(&mock_server)
        .await;

    let err = client.approve_migration().await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.user_message(), "Server error: 409 - no pending advice");
}

#[tokio::test]
async fn test_temperature_decision() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("POST"))
        .and(path("/prom/temperature/decisions"))
        .and(query_param("approval", "false"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prom/temperature/decisions"))
        .and(query_param("approval", "true"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    client.approve_temperature(false).await.unwrap();
    let err = client.approve_temperature(true).await.unwrap_err();
    assert!(matches!(err, BGreenError::RequestFailed { status: Some(502), .. }));
    assert_eq!(err.user_message(), "Server error: 502");
}
