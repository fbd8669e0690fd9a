//! The operator's optimization selection.

use serde::{Deserialize, Serialize};

/// VMs included in (selected) and excluded from (unselected) optimization.
///
/// The unselected list becomes the migration `block_list`; the selected list
/// is the default target set for stress tests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct OptimizationSelection {
    #[serde(rename = "selectedVMs", alias = "selectedVMIds", default)]
    pub selected_vm_ids: Vec<String>,
    #[serde(rename = "unselectedVMs", alias = "unselectedVMIds", default)]
    pub unselected_vm_ids: Vec<String>,
}

impl OptimizationSelection {
    pub fn new(selected_vm_ids: Vec<String>, unselected_vm_ids: Vec<String>) -> Self {
        Self {
            selected_vm_ids,
            unselected_vm_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_vm_ids.is_empty() && self.unselected_vm_ids.is_empty()
    }

    pub fn block_list(&self) -> &[String] {
        &self.unselected_vm_ids
    }
}
