//! Summary counts and chart series derived from snapshots.
//!
//! Every function here is total: empty or partial input yields zeroed or
//! empty output.

use crate::core::domain::model::{
    monitoring::MonitoringSnapshot,
    placement::{PhysicalMachineSnapshot, VmPlacement},
};
use std::sync::Arc;

/// Node and VM totals shown in the summary cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeVmCounts {
    /// Nodes drawing power or hosting at least one active VM.
    pub active_compute_count: usize,
    pub total_compute_count: usize,
    pub active_vm_count: usize,
    pub inactive_vm_count: usize,
}

/// Counts entities excluded from migration planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockedCounts {
    pub blocked_nodes: usize,
    /// Blocked VMs across both the active and inactive lists.
    pub blocked_vms: usize,
}

/// One chart point per node, in backend order.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSeriesPoint {
    pub name: String,
    pub active_vm_count: usize,
    pub inactive_vm_count: usize,
    /// Power of the node itself.
    pub total_power: f64,
    /// Sum of the power of the node's active VMs.
    pub active_vm_power: f64,
}

/// Per-node series for the resource distribution chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub active_vms: Vec<usize>,
    pub inactive_vms: Vec<usize>,
    pub total_power: Vec<f64>,
    pub vm_power: Vec<f64>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<NodeSeriesPoint> for ChartSeries {
    fn from_iter<I: IntoIterator<Item = NodeSeriesPoint>>(iter: I) -> Self {
        let mut series = ChartSeries::default();
        for point in iter {
            series.labels.push(point.name);
            series.active_vms.push(point.active_vm_count);
            series.inactive_vms.push(point.inactive_vm_count);
            series.total_power.push(point.total_power);
            series.vm_power.push(point.active_vm_power);
        }
        series
    }
}

/// Host and VM totals from the monitoring snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitoringCounts {
    /// Hosts with at least one VM.
    pub compute_count: usize,
    /// VMs on those hosts.
    pub vm_count: usize,
}

pub fn derive_counts(nodes: &[PhysicalMachineSnapshot]) -> NodeVmCounts {
    NodeVmCounts {
        active_compute_count: nodes
            .iter()
            .filter(|pm| pm.power_consumption > 0.0 || !pm.active_vms().is_empty())
            .count(),
        total_compute_count: nodes.len(),
        active_vm_count: nodes.iter().map(|pm| pm.active_vms().len()).sum(),
        inactive_vm_count: nodes.iter().map(|pm| pm.inactive_vms().len()).sum(),
    }
}

pub fn derive_series_points(nodes: &[PhysicalMachineSnapshot]) -> Vec<NodeSeriesPoint> {
    nodes
        .iter()
        .map(|pm| NodeSeriesPoint {
            name: pm.name.clone(),
            active_vm_count: pm.active_vms().len(),
            inactive_vm_count: pm.inactive_vms().len(),
            total_power: pm.power_consumption,
            active_vm_power: pm.active_vms().iter().map(|vm| vm.power).sum(),
        })
        .collect()
}

pub fn derive_chart_series(nodes: &[PhysicalMachineSnapshot]) -> ChartSeries {
    derive_series_points(nodes).into_iter().collect()
}

pub fn derive_blocked_counts(nodes: &[PhysicalMachineSnapshot]) -> BlockedCounts {
    BlockedCounts {
        blocked_nodes: nodes.iter().filter(|pm| pm.status.is_blocked()).count(),
        blocked_vms: nodes
            .iter()
            .flat_map(|pm| pm.all_vms())
            .filter(|vm| vm.status.is_blocked())
            .count(),
    }
}

/// Total power drawn by all nodes.
pub fn total_power(nodes: &[PhysicalMachineSnapshot]) -> f64 {
    nodes.iter().map(|pm| pm.power_consumption).sum()
}

pub fn monitoring_counts(snapshot: &MonitoringSnapshot) -> MonitoringCounts {
    let busy = snapshot.data.iter().filter(|h| !h.virtual_machines.is_empty());
    let (compute_count, vm_count) = busy.fold((0, 0), |(hosts, vms), h| {
        (hosts + 1, vms + h.virtual_machines.len())
    });
    MonitoringCounts {
        compute_count,
        vm_count,
    }
}

/// Everything the placement views derive from one snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementSummary {
    pub counts: NodeVmCounts,
    pub blocked: BlockedCounts,
    pub series: ChartSeries,
    pub total_power: f64,
}

impl PlacementSummary {
    pub fn from_placement(placement: &VmPlacement) -> Self {
        let nodes = &placement.physical_machines;
        Self {
            counts: derive_counts(nodes),
            blocked: derive_blocked_counts(nodes),
            series: derive_chart_series(nodes),
            total_power: total_power(nodes),
        }
    }
}

/// Caches a derived value and recomputes it only when handed a different
/// snapshot (by `Arc` identity).
#[derive(Debug)]
pub struct SnapshotMemo<T, R> {
    cached: Option<(Arc<T>, Arc<R>)>,
    compute: fn(&T) -> R,
}

impl<T, R> SnapshotMemo<T, R> {
    pub fn new(compute: fn(&T) -> R) -> Self {
        Self {
            cached: None,
            compute,
        }
    }

    pub fn get(&mut self, snapshot: &Arc<T>) -> Arc<R> {
        if let Some((seen, value)) = &self.cached
            && Arc::ptr_eq(seen, snapshot)
        {
            return Arc::clone(value);
        }
        let value = Arc::new((self.compute)(snapshot));
        self.cached = Some((Arc::clone(snapshot), Arc::clone(&value)));
        value
    }
}
