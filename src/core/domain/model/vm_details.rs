//! VM identity details from `/prom/vm_mac_details`.

use crate::core::domain::{model::Payload, value_object::serde_helpers::null_as_default};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Flavor and addressing of one VM.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VmDetails {
    pub name: String,
    pub original_name: String,
    pub host: String,
    pub ip: String,
    pub vcpus: u32,
    /// Memory in MB.
    pub ram: u64,
    /// Disk in GB.
    pub disk: u64,
    pub ephemeral: u64,
    pub swap: u64,
    pub extra_specs: serde_json::Map<String, serde_json::Value>,
}

/// VM id to details, wrapped under `res` by the backend.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct VmDetailsIndex {
    #[serde(default, deserialize_with = "null_as_default")]
    pub res: IndexMap<String, VmDetails>,
}

impl VmDetailsIndex {
    pub fn get(&self, vm_id: &str) -> Option<&VmDetails> {
        self.res.get(vm_id)
    }

    /// Looks a VM up by its IP, the identifier stress tests use.
    pub fn by_ip(&self, ip: &str) -> Option<(&String, &VmDetails)> {
        self.res.iter().find(|(_, d)| d.ip == ip)
    }

    pub fn len(&self) -> usize {
        self.res.len()
    }

    pub fn is_empty(&self) -> bool {
        self.res.is_empty()
    }
}

impl Payload for VmDetailsIndex {}
