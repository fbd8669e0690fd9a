//! Backend paths, relative to the base URL.

pub const VM_PLACEMENT: &str = "/prom/get_chart_data/vm_placement";
pub const GAIN_BEFORE: &str = "/prom/get_chart_data/gain_before";
pub const MIGRATION_ADVICE: &str = "/prom/get_chart_data/migration";
pub const GAIN_AFTER: &str = "/prom/get_chart_data/gain_after";
pub const MONITORING: &str = "/prom/monitoring";
pub const VM_DETAILS: &str = "/prom/vm_mac_details";

pub const MONITORING_START: &str = "/prom/monitoring/start";
pub const MONITORING_STOP: &str = "/prom/monitoring/stop";
pub const MONITORING_STATUS: &str = "/prom/monitoring/status";

pub const STRESS_START: &str = "/stress/start";
pub const STRESS_STOP: &str = "/stress/stop";
pub const STRESS_STATUS: &str = "/stress/status";

/// Last `rows` maintenance records.
pub fn maintenance(rows: usize) -> String {
    format!("/prom/get_chart_data/maintenance/{}", rows)
}

/// Last `rows` temperature records.
pub fn temperature(rows: usize) -> String {
    format!("/prom/get_chart_data/temperature/{}", rows)
}

pub fn migration_decision(run_migration: bool) -> String {
    format!("/prom/migration/decisions4?run_migration={}", run_migration)
}

pub fn temperature_decision(approval: bool) -> String {
    format!("/prom/temperature/decisions?approval={}", approval)
}
