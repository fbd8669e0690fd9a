//! Client-side polling and aggregation layer of the B'GREEN power and VM
//! placement dashboard.

pub mod core;
pub mod polling;

pub use crate::core::application::aggregation::{
    BlockedCounts, ChartSeries, MonitoringCounts, NodeSeriesPoint, NodeVmCounts,
    PlacementSummary, SnapshotMemo, derive_blocked_counts, derive_chart_series, derive_counts,
    monitoring_counts, total_power,
};
pub use crate::core::domain::error::{BGreenError, BGreenResult, ValidationError};
pub use crate::core::domain::value_object::{BaseUrl, EnvSettings, WeightKey, WeightVector};
pub use crate::core::infrastructure::api_client::{ApiClient, LineStream};
pub use crate::core::infrastructure::config::{ClientConfig, PollIntervals, RateLimitConfig};
pub use crate::core::infrastructure::storage::{FileStore, KeyValueStore, LocalState, MemoryStore};
pub use crate::polling::{FailurePolicy, HookState, PollHandle, PollSource, Poller};

use crate::core::{
    domain::model::{
        monitoring::MonitoringStatus,
        monitoring_config::MonitoringConfig,
        stress::{StressConfig, StressStatusMap},
    },
    infrastructure::endpoints,
};
use crate::polling::sources::{
    GainAfterSource, MaintenanceSource, MigrationAdviceSource, MonitoringSnapshotSource,
    MonitoringStatusSource, PlacementSource, StatusCache, StressStatusSource, TemperatureSource,
    VmDetailsSource,
};
use std::time::Duration;
use tracing::{info, warn};

/// Progress lines streamed back while an approved migration runs.
pub type MigrationProgress = LineStream;

/// Entry point of the B'GREEN client.
///
/// Owns the HTTP client, starts the polling hooks and issues the operator's
/// write operations.
///
/// # Examples
///
/// ```no_run
/// use bgreen_client::{BGreenClient, BGreenResult};
///
/// #[tokio::main]
/// async fn main() -> BGreenResult<()> {
///     let client = BGreenClient::builder()
///         .base_url("http://localhost:8003")?
///         .build()?;
///
///     let placement = client.watch_placement();
///     placement.refetch().await;
///     if let Some(snapshot) = placement.latest() {
///         println!("{} nodes", snapshot.physical_machines.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BGreenClient {
    api: ApiClient,
    status_cache: StatusCache,
}

/// Builder for BGreenClient configuration
#[derive(Debug, Default)]
pub struct BGreenClientBuilder {
    base_url: Option<BaseUrl>,
    config: ClientConfig,
}

impl BGreenClientBuilder {
    /// Uses `url` instead of the environment-resolved base URL.
    pub fn base_url(mut self, url: impl AsRef<str>) -> BGreenResult<Self> {
        self.base_url = Some(BaseUrl::parse(url)?);
        Ok(self)
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn history_len(mut self, rows: usize) -> Self {
        self.config.history_len = rows;
        self
    }

    pub fn rate_limit(mut self, requests_per_second: u32, burst_size: u32) -> Self {
        self.config.rate_limit = Some(RateLimitConfig {
            requests_per_second,
            burst_size,
        });
        self
    }

    /// Builds the client, resolving the base URL from the environment when
    /// none was given.
    pub fn build(self) -> BGreenResult<BGreenClient> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => BaseUrl::from_process_env()?,
        };
        let api = ApiClient::new(base_url, self.config)?;
        Ok(BGreenClient {
            api,
            status_cache: StatusCache::default(),
        })
    }
}

impl BGreenClient {
    /// Creates a new builder for BGreenClient configuration
    pub fn builder() -> BGreenClientBuilder {
        BGreenClientBuilder::default()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn base_url(&self) -> &BaseUrl {
        self.api.base_url()
    }

    pub fn config(&self) -> &ClientConfig {
        self.api.config()
    }

    /// The last monitoring status seen by this client or its status hook.
    pub fn last_known_status(&self) -> Option<MonitoringStatus> {
        self.status_cache.get()
    }

    fn intervals(&self) -> PollIntervals {
        self.api.config().intervals
    }

    // Hooks. Each starts polling immediately and stops when its handle is
    // dropped; must be called within a tokio runtime.

    pub fn watch_migration_advice(&self) -> PollHandle<MigrationAdviceSource> {
        Poller::spawn(MigrationAdviceSource, self.api.clone(), self.intervals().advisory)
    }

    pub fn watch_gain_after(&self) -> PollHandle<GainAfterSource> {
        Poller::spawn(GainAfterSource, self.api.clone(), self.intervals().advisory)
    }

    pub fn watch_placement(&self) -> PollHandle<PlacementSource> {
        Poller::spawn(PlacementSource, self.api.clone(), self.intervals().advisory)
    }

    pub fn watch_monitoring(&self) -> PollHandle<MonitoringSnapshotSource> {
        Poller::spawn(MonitoringSnapshotSource, self.api.clone(), self.intervals().advisory)
    }

    pub fn watch_vm_details(&self) -> PollHandle<VmDetailsSource> {
        Poller::spawn(VmDetailsSource, self.api.clone(), self.intervals().advisory)
    }

    pub fn watch_maintenance(&self) -> PollHandle<MaintenanceSource> {
        let source = MaintenanceSource {
            rows: self.config().history_len,
        };
        Poller::spawn(source, self.api.clone(), self.intervals().telemetry)
    }

    pub fn watch_temperature(&self) -> PollHandle<TemperatureSource> {
        let source = TemperatureSource {
            rows: self.config().history_len,
        };
        Poller::spawn(source, self.api.clone(), self.intervals().temperature)
    }

    pub fn watch_monitoring_status(&self) -> PollHandle<MonitoringStatusSource> {
        let source = MonitoringStatusSource::with_cache(self.status_cache.clone());
        Poller::spawn(source, self.api.clone(), self.intervals().status)
    }

    pub fn watch_stress_status(&self, vms: Vec<String>) -> PollHandle<StressStatusSource> {
        let source = StressStatusSource::new(vms, self.config().status_timeout);
        Poller::spawn(source, self.api.clone(), self.intervals().telemetry)
    }

    // Monitoring

    /// Starts the monitoring services with `config`.
    ///
    /// Returns the config that was sent. The status is read again once the
    /// backend acknowledges; if that read fails, every service is recorded as
    /// running so a second start is refused. Hook handles are not refreshed:
    /// call [`PollHandle::refetch`] on the status hook afterwards.
    ///
    /// # Errors
    ///
    /// - `Validation` if `weights` do not sum to 100 or `config` holds a
    ///   value outside the allowed options (nothing is sent)
    /// - `AlreadyRunning` if any monitoring service is running
    /// - `RequestFailed` or `Timeout` if the start call fails
    pub async fn start_monitoring(
        &self,
        config: &MonitoringConfig,
        weights: &WeightVector,
    ) -> BGreenResult<MonitoringConfig> {
        if !weights.is_valid() {
            return Err(ValidationError::Field {
                field: "weights".to_string(),
                message: format!("must sum to 100%, got {}%", weights.sum()),
            }
            .into());
        }
        config.validate()?;

        let status = match self.monitoring_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(error = %e, "status refresh failed, using last known status");
                self.status_cache.get()
            }
        };
        if status.is_some_and(|s| s.any_running()) {
            return Err(BGreenError::AlreadyRunning);
        }

        self.api
            .post_ack(endpoints::MONITORING_START, Some(config), self.config().write_timeout)
            .await?;
        info!(
            migration_method = ?config.migration.migration_method,
            block_list = config.migration.block_list.len(),
            "monitoring started"
        );
        self.refresh_status_after_write(Some(MonitoringStatus::uniform(true)))
            .await;
        Ok(config.clone())
    }

    /// Stops the monitoring services, then reads the status again. If that
    /// read fails the last known status is forgotten. As with
    /// [`start_monitoring`](Self::start_monitoring), refetch the status hook
    /// afterwards.
    pub async fn stop_monitoring(&self) -> BGreenResult<()> {
        self.api
            .post_ack(endpoints::MONITORING_STOP, None::<&()>, self.config().write_timeout)
            .await?;
        info!("monitoring stopped");
        self.refresh_status_after_write(None).await;
        Ok(())
    }

    /// Fetches the run state of the monitoring services.
    pub async fn monitoring_status(&self) -> BGreenResult<MonitoringStatus> {
        let ticket = self.status_cache.ticket();
        let status: MonitoringStatus = self.api.get(endpoints::MONITORING_STATUS).await?;
        self.status_cache.offer(ticket, Some(status.clone()));
        Ok(status)
    }

    async fn refresh_status_after_write(&self, fallback: Option<MonitoringStatus>) {
        // ranks before the refresh and after anything already in flight
        let fallback_ticket = self.status_cache.ticket();
        if let Err(e) = self.monitoring_status().await {
            warn!(error = %e, "status refresh after write failed");
            self.status_cache.offer(fallback_ticket, fallback);
        }
    }

    // Decisions

    /// Approves the current migration advice. The returned stream yields the
    /// backend's progress lines until the migration finishes.
    pub async fn approve_migration(&self) -> BGreenResult<MigrationProgress> {
        let stream = self
            .api
            .post_stream(&endpoints::migration_decision(true), self.config().write_timeout)
            .await?;
        info!("migration approved");
        Ok(stream)
    }

    pub async fn decline_migration(&self) -> BGreenResult<()> {
        self.api
            .post_ack(
                &endpoints::migration_decision(false),
                None::<&()>,
                self.config().write_timeout,
            )
            .await?;
        info!("migration declined");
        Ok(())
    }

    /// Approves (`true`) or declines (`false`) the temperature recommendation.
    pub async fn approve_temperature(&self, approval: bool) -> BGreenResult<()> {
        self.api
            .post_ack(
                &endpoints::temperature_decision(approval),
                None::<&()>,
                self.config().write_timeout,
            )
            .await?;
        info!(approval, "temperature decision sent");
        Ok(())
    }

    // Stress testing

    pub async fn start_stress(&self, config: &StressConfig) -> BGreenResult<()> {
        if config.vms.is_empty() {
            return Err(ValidationError::Field {
                field: "vms".to_string(),
                message: "select at least one VM".to_string(),
            }
            .into());
        }
        self.api
            .post_ack(endpoints::STRESS_START, Some(config), self.config().write_timeout)
            .await?;
        info!(vms = config.vms.len(), level = ?config.level, "stress test started");
        Ok(())
    }

    pub async fn stop_stress(&self, vms: &[String]) -> BGreenResult<()> {
        self.api
            .post_ack(endpoints::STRESS_STOP, Some(vms), self.config().write_timeout)
            .await?;
        info!(vms = vms.len(), "stress test stopped");
        Ok(())
    }

    pub async fn stress_status(&self, vms: &[String]) -> BGreenResult<StressStatusMap> {
        self.api
            .post(endpoints::STRESS_STATUS, vms, Some(self.config().status_timeout))
            .await
    }
}
