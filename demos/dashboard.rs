//! Polls every dashboard data domain and prints a summary line per refresh.
//!
//! Run with `BGREEN_API_URL=http://host:port cargo run --example dashboard`.
//! Pass `--start` to start monitoring with the saved preferences first.

use bgreen_client::core::domain::model::monitoring_config::MonitoringPreferences;
use bgreen_client::{
    BGreenClient, BGreenResult, FileStore, LocalState, PlacementSummary, SnapshotMemo,
    monitoring_counts,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> BGreenResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bgreen_client=info")),
        )
        .init();

    let client = BGreenClient::builder().build()?;
    info!(base_url = %client.base_url(), "dashboard starting");

    let state = LocalState::new(FileStore::new(".bgreen"));
    let selection = state.load_selection().await;
    let preferences: MonitoringPreferences = state.load_preferences().await;
    info!(
        blocked = selection.block_list().len(),
        weights_valid = preferences.weights.is_valid(),
        "local state loaded"
    );

    let placement = client.watch_placement();
    let monitoring = client.watch_monitoring();
    let status = client.watch_monitoring_status();
    let advice = client.watch_migration_advice();

    if std::env::args().any(|arg| arg == "--start") {
        let mut config = preferences.config.clone();
        config.migration.block_list = selection.block_list().to_vec();
        match client.start_monitoring(&config, &preferences.weights).await {
            Ok(_) => status.refetch().await,
            Err(e) => warn!(error = %e, "{}", e.user_message()),
        }
    }
    let maintenance = client.watch_maintenance();

    let mut summaries = SnapshotMemo::new(PlacementSummary::from_placement);
    let mut placement_updates = placement.subscribe();

    for _ in 0..10 {
        let _ = tokio::time::timeout(Duration::from_secs(30), placement_updates.changed()).await;

        if let Some(snapshot) = placement.latest() {
            let summary = summaries.get(&snapshot);
            println!(
                "nodes {}/{} active, VMs {} active / {} inactive, {} blocked, {:.1} W",
                summary.counts.active_compute_count,
                summary.counts.total_compute_count,
                summary.counts.active_vm_count,
                summary.counts.inactive_vm_count,
                summary.blocked.blocked_vms,
                summary.total_power,
            );
        } else if placement.is_loading() {
            println!("placement loading...");
        }

        if let Some(view) = monitoring.latest() {
            let counts = monitoring_counts(&view.snapshot);
            println!(
                "monitored: {} computes, {} VMs, stable hosts {:?}",
                counts.compute_count, counts.vm_count, view.stable_hosts
            );
        }
        if let Some(run) = status.latest() {
            println!("monitoring running: {}", run.any_running());
        }
        if let Some(outlook) = advice.latest() {
            println!(
                "advice: {} moves, estimated gain {:.1}%",
                outlook.advice.moves().count(),
                outlook.gain.proposed_gain_ratio * 100.0
            );
        }
        if let Some(flag) = maintenance.latest().as_deref().and_then(|s| s.current_flag()) {
            println!("maintenance flag: {}", flag);
        }
    }

    state.save_preferences(&preferences).await?;
    Ok(())
}
