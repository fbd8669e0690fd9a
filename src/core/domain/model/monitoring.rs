//! Domain models for the monitoring services and the monitoring snapshot.

use crate::core::domain::{
    error::ValidationError, model::Payload, value_object::serde_helpers::null_as_default,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The three backend monitoring services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoringService {
    Migration,
    Environmental,
    Preventive,
}

impl MonitoringService {
    pub const ALL: [MonitoringService; 3] = [
        MonitoringService::Migration,
        MonitoringService::Environmental,
        MonitoringService::Preventive,
    ];
}

/// Run state of one service. `Unknown` is what a missing flag decodes to
/// and is never treated as stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    Running,
    Stopped,
    #[default]
    Unknown,
}

impl RunState {
    pub fn label(self) -> &'static str {
        match self {
            RunState::Running => "Running",
            RunState::Stopped => "Stopped",
            RunState::Unknown => "Unknown",
        }
    }
}

impl From<Option<bool>> for RunState {
    fn from(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => RunState::Running,
            Some(false) => RunState::Stopped,
            None => RunState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub is_running: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ServiceStatuses {
    #[serde(default)]
    pub migration: Option<ServiceStatus>,
    #[serde(default)]
    pub environmental: Option<ServiceStatus>,
    #[serde(default)]
    pub preventive: Option<ServiceStatus>,
}

/// Response of the monitoring status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct MonitoringStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub statuses: ServiceStatuses,
}

impl MonitoringStatus {
    /// A status with every service in the same known state.
    pub fn uniform(is_running: bool) -> Self {
        let service = || {
            Some(ServiceStatus {
                is_running: Some(is_running),
            })
        };
        Self {
            statuses: ServiceStatuses {
                migration: service(),
                environmental: service(),
                preventive: service(),
            },
        }
    }

    pub fn state(&self, service: MonitoringService) -> RunState {
        let slot = match service {
            MonitoringService::Migration => &self.statuses.migration,
            MonitoringService::Environmental => &self.statuses.environmental,
            MonitoringService::Preventive => &self.statuses.preventive,
        };
        slot.as_ref().and_then(|s| s.is_running).into()
    }

    /// `true` if at least one service is known to be running.
    pub fn any_running(&self) -> bool {
        MonitoringService::ALL
            .iter()
            .any(|s| self.state(*s) == RunState::Running)
    }

    pub fn all_running(&self) -> bool {
        MonitoringService::ALL
            .iter()
            .all(|s| self.state(*s) == RunState::Running)
    }

    pub fn all_stopped(&self) -> bool {
        MonitoringService::ALL
            .iter()
            .all(|s| self.state(*s) == RunState::Stopped)
    }
}

impl Payload for MonitoringStatus {}

/// A VM entry in the monitoring snapshot: a bare identifier or a record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MonitoredVm {
    Id(String),
    Record {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        ip: Option<String>,
    },
}

/// One host as listed by `/prom/monitoring`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoredHost {
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub virtual_machines: Vec<MonitoredVm>,
}

/// A compute node of the optimization space.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ComputeNode {
    #[serde(default)]
    pub host_ip: String,
    /// VM name to VM IP.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hosted_vms: IndexMap<String, String>,
}

/// A VM that can be picked for optimization or stress testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableVm {
    /// `<compute>-<vm name>`, unique across the optimization space.
    pub id: String,
    pub name: String,
    pub ip: String,
}

/// The `/prom/monitoring` payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MonitoringSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<MonitoredHost>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub optimization_space: IndexMap<String, ComputeNode>,
}

impl MonitoringSnapshot {
    /// Host names in response order.
    pub fn host_names(&self) -> Vec<String> {
        self.data.iter().map(|h| h.host.clone()).collect()
    }

    /// Flattens the optimization space, compute nodes and VMs in response order.
    pub fn available_vms(&self) -> Vec<AvailableVm> {
        self.optimization_space
            .iter()
            .flat_map(|(compute, node)| {
                node.hosted_vms.iter().map(move |(name, ip)| AvailableVm {
                    id: format!("{}-{}", compute, name),
                    name: name.clone(),
                    ip: ip.clone(),
                })
            })
            .collect()
    }
}

impl Payload for MonitoringSnapshot {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.data.iter().any(|h| h.host.trim().is_empty()) {
            return Err(ValidationError::field("data.host", "host cannot be empty"));
        }
        Ok(())
    }
}
