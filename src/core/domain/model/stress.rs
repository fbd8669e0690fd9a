//! Domain models for VM stress testing.

use crate::core::domain::model::Payload;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Synthetic load intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Body of `POST /stress/start`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StressConfig {
    /// VM identifiers (IPs) to load.
    pub vms: Vec<String>,
    pub level: StressLevel,
    pub force: bool,
}

impl StressConfig {
    /// A forced run on `vms`, which is what the dashboard always sends.
    pub fn new(vms: Vec<String>, level: StressLevel) -> Self {
        Self {
            vms,
            level,
            force: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct StressRunState {
    #[serde(default)]
    pub is_running: bool,
}

/// Response of `POST /stress/status`: VM to run state, in response order.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StressStatusMap(IndexMap<String, StressRunState>);

impl StressStatusMap {
    /// VMs currently under load.
    pub fn running_vms(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, state)| state.is_running)
            .map(|(vm, _)| vm.clone())
            .collect()
    }

    pub fn is_running(&self, vm: &str) -> bool {
        self.0.get(vm).is_some_and(|s| s.is_running)
    }

    /// `true` while any VM is still under load.
    pub fn any_running(&self) -> bool {
        self.0.values().any(|s| s.is_running)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, StressRunState)> for StressStatusMap {
    fn from_iter<I: IntoIterator<Item = (String, StressRunState)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Payload for StressStatusMap {}
