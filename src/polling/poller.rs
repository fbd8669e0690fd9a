//! Generic timer-driven poller.
//!
//! A [`Poller`] runs one [`PollSource`] on a fixed interval and publishes
//! the outcome through a [`PollHandle`]. Each tick is tagged with a
//! generation number when dispatched; a result is applied only when it is
//! newer than the last applied one, so a slow response can never overwrite
//! fresher state. Once the handle is stopped or dropped, ticks still in
//! flight resolve into no-ops.

use crate::core::{domain::error::BGreenResult, infrastructure::api_client::ApiClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// What a failed tick does to the last good result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop it; the view shows no data until the next success.
    Clear,
    /// Keep showing it.
    Preserve,
}

/// One data domain the dashboard polls.
#[async_trait]
pub trait PollSource: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Performs the backend call(s) of one tick.
    async fn fetch(&self, client: &ApiClient) -> BGreenResult<Self::Output>;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Preserve
    }

    /// Combines a fresh result with the currently applied one.
    fn reconcile(&self, _previous: Option<&Self::Output>, fresh: Self::Output) -> Self::Output {
        fresh
    }
}

/// Observable state of a hook.
#[derive(Debug)]
pub struct HookState<T> {
    latest: Option<Arc<T>>,
    is_loading: bool,
    generation: u64,
    pending: usize,
}

impl<T> HookState<T> {
    /// The last applied result.
    pub fn latest(&self) -> Option<&Arc<T>> {
        self.latest.as_ref()
    }

    /// `true` only while a first result is awaited.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Generation of the last applied tick, 0 before any.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Default for HookState<T> {
    fn default() -> Self {
        Self {
            latest: None,
            is_loading: false,
            generation: 0,
            pending: 0,
        }
    }
}

impl<T> Clone for HookState<T> {
    fn clone(&self) -> Self {
        Self {
            latest: self.latest.clone(),
            is_loading: self.is_loading,
            generation: self.generation,
            pending: self.pending,
        }
    }
}

struct Shared<S: PollSource> {
    source: S,
    client: ApiClient,
    dispatched: AtomicU64,
    torn_down: AtomicBool,
    state: watch::Sender<HookState<S::Output>>,
}

impl<S: PollSource> Shared<S> {
    async fn tick(&self) {
        if self.torn_down.load(Ordering::Acquire) {
            return;
        }
        let generation = self.dispatched.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.send_modify(|st| {
            st.pending += 1;
            if st.latest.is_none() {
                st.is_loading = true;
            }
        });

        let result = self.source.fetch(&self.client).await;

        if self.torn_down.load(Ordering::Acquire) {
            debug!(hook = self.source.name(), generation, "result after teardown ignored");
            self.state.send_modify(|st| {
                st.pending = st.pending.saturating_sub(1);
                st.is_loading = false;
            });
            return;
        }

        self.state.send_modify(|st| {
            st.pending = st.pending.saturating_sub(1);
            if generation <= st.generation {
                debug!(
                    hook = self.source.name(),
                    generation,
                    applied = st.generation,
                    "stale result discarded"
                );
            } else {
                st.generation = generation;
                match result {
                    Ok(fresh) => {
                        let merged = self.source.reconcile(st.latest.as_deref(), fresh);
                        st.latest = Some(Arc::new(merged));
                    }
                    Err(e) => {
                        warn!(hook = self.source.name(), error = %e, "poll failed");
                        if self.source.failure_policy() == FailurePolicy::Clear {
                            st.latest = None;
                        }
                    }
                }
            }
            if st.pending == 0 || st.latest.is_some() {
                st.is_loading = false;
            }
        });
    }
}

/// Starts pollers.
pub struct Poller;

impl Poller {
    /// Fetches immediately, then every `interval`, until the returned handle
    /// is stopped or dropped. Must be called within a tokio runtime.
    pub fn spawn<S: PollSource>(source: S, client: ApiClient, interval: Duration) -> PollHandle<S> {
        let (state, _) = watch::channel(HookState::default());
        let shared = Arc::new(Shared {
            source,
            client,
            dispatched: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
            state,
        });

        let driver_shared = Arc::clone(&shared);
        let driver = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if driver_shared.torn_down.load(Ordering::Acquire) {
                    break;
                }
                // Ticks may overlap; generations order them.
                let tick_shared = Arc::clone(&driver_shared);
                tokio::spawn(async move { tick_shared.tick().await });
            }
        });

        debug!(hook = shared.source.name(), ?interval, "poller started");
        PollHandle { shared, driver }
    }
}

/// Owner of a running poller.
pub struct PollHandle<S: PollSource> {
    shared: Arc<Shared<S>>,
    driver: JoinHandle<()>,
}

impl<S: PollSource> PollHandle<S> {
    pub fn name(&self) -> &'static str {
        self.shared.source.name()
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    pub fn latest(&self) -> Option<Arc<S::Output>> {
        self.shared.state.borrow().latest.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading
    }

    pub fn state(&self) -> HookState<S::Output> {
        self.shared.state.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<HookState<S::Output>> {
        self.shared.state.subscribe()
    }

    /// Runs one tick now and waits for it to be applied (or discarded).
    pub async fn refetch(&self) {
        self.shared.tick().await;
    }

    /// Stops the timer. Ticks in flight finish without applying their
    /// results, and the hook no longer reports loading.
    pub fn stop(&self) {
        if !self.shared.torn_down.swap(true, Ordering::AcqRel) {
            self.driver.abort();
            self.shared.state.send_modify(|st| st.is_loading = false);
            debug!(hook = self.name(), "poller stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.torn_down.load(Ordering::Acquire)
    }
}

impl<S: PollSource> Drop for PollHandle<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: PollSource> std::fmt::Debug for PollHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("name", &self.name())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
