pub mod poller;
pub mod sources;

pub use poller::{FailurePolicy, HookState, PollHandle, PollSource, Poller};
pub use sources::{
    GainAfterSource, MaintenanceSource, MigrationAdviceSource, MonitoringSnapshotSource,
    MonitoringStatusSource, MonitoringView, PlacementSource, StressStatusSource,
    StatusCache, TemperatureSource, VmDetailsSource,
};
