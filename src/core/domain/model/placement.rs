//! Domain models for the VM placement snapshot.
//!
//! This module defines the node/VM tree returned by the
//! `/prom/get_chart_data/vm_placement` endpoint.

use crate::core::domain::{
    error::ValidationError, model::Payload, value_object::serde_helpers::null_as_default,
};
use serde::{Deserialize, Serialize};

/// Whether an entity takes part in migration planning.
///
/// Independent of the active/inactive split: a running VM can be blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Open,
    Blocked,
}

impl EntityStatus {
    pub fn is_blocked(self) -> bool {
        self == EntityStatus::Blocked
    }
}

/// Hardware allocation of a VM.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct VmConfig {
    /// Virtual CPU count.
    #[serde(default)]
    pub cpu: f64,
    /// Memory in GB.
    #[serde(default, rename = "ram")]
    pub ram_gb: f64,
    /// Disk in GB.
    #[serde(default, rename = "disk")]
    pub disk_gb: f64,
}

/// One VM within a node.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VirtualMachineSnapshot {
    pub name: String,
    /// Watts. Expected to be 0 for inactive VMs but displayed as sent.
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(
        default,
        rename = "confg",
        alias = "config",
        skip_serializing_if = "Option::is_none"
    )]
    pub config: Option<VmConfig>,
}

/// The active and inactive VMs of a node, in backend order.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct VmLists {
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: Vec<VirtualMachineSnapshot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inactive: Vec<VirtualMachineSnapshot>,
}

/// One compute node at a point in time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PhysicalMachineSnapshot {
    pub name: String,
    /// Watts drawn by the node.
    #[serde(default)]
    pub power_consumption: f64,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vms: VmLists,
}

impl PhysicalMachineSnapshot {
    pub fn active_vms(&self) -> &[VirtualMachineSnapshot] {
        &self.vms.active
    }

    pub fn inactive_vms(&self) -> &[VirtualMachineSnapshot] {
        &self.vms.inactive
    }

    /// All VMs, active first.
    pub fn all_vms(&self) -> impl Iterator<Item = &VirtualMachineSnapshot> {
        self.vms.active.iter().chain(self.vms.inactive.iter())
    }

    /// `true` for a node with no VMs in either list ("no VMs running").
    pub fn is_empty(&self) -> bool {
        self.vms.active.is_empty() && self.vms.inactive.is_empty()
    }
}

/// The `/vm_placement` payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct VmPlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub physical_machines: Vec<PhysicalMachineSnapshot>,
}

impl Payload for VmPlacement {
    fn validate(&self) -> Result<(), ValidationError> {
        for pm in &self.physical_machines {
            if pm.name.trim().is_empty() {
                return Err(ValidationError::field(
                    "physical_machines.name",
                    "node name cannot be empty",
                ));
            }
            if !pm.power_consumption.is_finite() || pm.power_consumption < 0.0 {
                return Err(ValidationError::field(
                    "physical_machines.power_consumption",
                    format!(
                        "node '{}' reports invalid power {}",
                        pm.name, pm.power_consumption
                    ),
                ));
            }
        }
        Ok(())
    }
}
