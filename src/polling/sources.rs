//! The data domains the dashboard polls.

use crate::core::{
    domain::{
        error::BGreenResult,
        model::{
            migration::{GainEstimate, GainVerification, MigrationAdviceMap, MigrationOutlook},
            monitoring::{MonitoringSnapshot, MonitoringStatus},
            placement::VmPlacement,
            stress::StressStatusMap,
            telemetry::{MaintenanceSeries, TemperatureSeries},
            vm_details::VmDetailsIndex,
        },
    },
    infrastructure::{api_client::ApiClient, endpoints},
};
use crate::polling::poller::{FailurePolicy, PollSource};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Gain estimate and migration advice, fetched in parallel. Both must
/// succeed; otherwise the pair is cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationAdviceSource;

#[async_trait]
impl PollSource for MigrationAdviceSource {
    type Output = MigrationOutlook;

    fn name(&self) -> &'static str {
        "migration_advice"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<MigrationOutlook> {
        let (gain, advice) = tokio::try_join!(
            client.get::<GainEstimate>(endpoints::GAIN_BEFORE),
            client.get::<MigrationAdviceMap>(endpoints::MIGRATION_ADVICE),
        )?;
        Ok(MigrationOutlook { gain, advice })
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Clear
    }
}

/// Measured gain after a migration ran.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainAfterSource;

#[async_trait]
impl PollSource for GainAfterSource {
    type Output = GainVerification;

    fn name(&self) -> &'static str {
        "gain_after"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<GainVerification> {
        client.get(endpoints::GAIN_AFTER).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementSource;

#[async_trait]
impl PollSource for PlacementSource {
    type Output = VmPlacement;

    fn name(&self) -> &'static str {
        "vm_placement"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<VmPlacement> {
        client.get(endpoints::VM_PLACEMENT).await
    }
}

/// A monitoring snapshot plus the hosts considered stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoringView {
    pub snapshot: MonitoringSnapshot,
    /// Hosts of `snapshot` that were also in the previous successful
    /// response, in response order. Every host on the first response.
    pub stable_hosts: Vec<String>,
}

impl MonitoringView {
    fn first(snapshot: MonitoringSnapshot) -> Self {
        let stable_hosts = dedup(snapshot.host_names());
        Self {
            snapshot,
            stable_hosts,
        }
    }

    fn following(previous: &MonitoringSnapshot, snapshot: MonitoringSnapshot) -> Self {
        let seen: HashSet<&str> = previous.data.iter().map(|h| h.host.as_str()).collect();
        let stable_hosts = dedup(snapshot.host_names())
            .into_iter()
            .filter(|host| seen.contains(host.as_str()))
            .collect();
        Self {
            snapshot,
            stable_hosts,
        }
    }
}

fn dedup(hosts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    hosts
        .into_iter()
        .filter(|h| seen.insert(h.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonitoringSnapshotSource;

#[async_trait]
impl PollSource for MonitoringSnapshotSource {
    type Output = MonitoringView;

    fn name(&self) -> &'static str {
        "monitoring"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<MonitoringView> {
        let snapshot: MonitoringSnapshot = client.get(endpoints::MONITORING).await?;
        Ok(MonitoringView::first(snapshot))
    }

    fn reconcile(&self, previous: Option<&MonitoringView>, fresh: MonitoringView) -> MonitoringView {
        match previous {
            Some(previous) => MonitoringView::following(&previous.snapshot, fresh.snapshot),
            None => fresh,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VmDetailsSource;

#[async_trait]
impl PollSource for VmDetailsSource {
    type Output = VmDetailsIndex;

    fn name(&self) -> &'static str {
        "vm_details"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<VmDetailsIndex> {
        client.get(endpoints::VM_DETAILS).await
    }
}

/// Power history with prediction bands and the maintenance flag.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceSource {
    pub rows: usize,
}

#[async_trait]
impl PollSource for MaintenanceSource {
    type Output = MaintenanceSeries;

    fn name(&self) -> &'static str {
        "maintenance"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<MaintenanceSeries> {
        client.get(&endpoints::maintenance(self.rows)).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TemperatureSource {
    pub rows: usize,
}

#[async_trait]
impl PollSource for TemperatureSource {
    type Output = TemperatureSeries;

    fn name(&self) -> &'static str {
        "temperature"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<TemperatureSeries> {
        client.get(&endpoints::temperature(self.rows)).await
    }
}

#[derive(Debug, Default)]
struct StatusSlot {
    status: Option<MonitoringStatus>,
    ticket: u64,
}

/// The most recent monitoring status seen by any reader.
///
/// Readers take a [`ticket`](StatusCache::ticket) before sending a status
/// request and [`offer`](StatusCache::offer) the answer with it. An answer is
/// recorded only if no later ticket was recorded first, so a slow response
/// never replaces a newer one.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    slot: Arc<RwLock<StatusSlot>>,
    issued: Arc<AtomicU64>,
}

impl StatusCache {
    pub fn get(&self) -> Option<MonitoringStatus> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .clone()
    }

    /// Reserves the ordering position of a request about to be sent.
    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records `status` unless a later ticket is already recorded. Returns
    /// whether it was recorded.
    pub fn offer(&self, ticket: u64, status: Option<MonitoringStatus>) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if ticket <= slot.ticket {
            debug!(ticket, recorded = slot.ticket, "stale status discarded");
            return false;
        }
        slot.ticket = ticket;
        slot.status = status;
        true
    }

    /// Records `status` now; answers to requests already in flight are
    /// discarded when they arrive.
    pub fn set(&self, status: Option<MonitoringStatus>) {
        let ticket = self.ticket();
        self.offer(ticket, status);
    }
}

/// Run state of the monitoring services, which gates start/stop.
#[derive(Debug, Clone, Default)]
pub struct MonitoringStatusSource {
    cache: StatusCache,
}

impl MonitoringStatusSource {
    /// A source that also records every status it fetches into `cache`.
    pub fn with_cache(cache: StatusCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PollSource for MonitoringStatusSource {
    type Output = MonitoringStatus;

    fn name(&self) -> &'static str {
        "monitoring_status"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<MonitoringStatus> {
        let ticket = self.cache.ticket();
        let status: MonitoringStatus = client.get(endpoints::MONITORING_STATUS).await?;
        self.cache.offer(ticket, Some(status.clone()));
        Ok(status)
    }
}

/// Stress run state of a fixed set of VMs.
#[derive(Debug, Clone)]
pub struct StressStatusSource {
    vms: Vec<String>,
    timeout: Duration,
}

impl StressStatusSource {
    pub fn new(vms: Vec<String>, timeout: Duration) -> Self {
        Self { vms, timeout }
    }

    pub fn vms(&self) -> &[String] {
        &self.vms
    }
}

#[async_trait]
impl PollSource for StressStatusSource {
    type Output = StressStatusMap;

    fn name(&self) -> &'static str {
        "stress_status"
    }

    async fn fetch(&self, client: &ApiClient) -> BGreenResult<StressStatusMap> {
        if self.vms.is_empty() {
            return Ok(StressStatusMap::default());
        }
        client
            .post(endpoints::STRESS_STATUS, &self.vms, Some(self.timeout))
            .await
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Clear
    }
}
