//! Client-side tuning: timeouts, poll intervals and rate limiting.

use std::time::Duration;

/// Client-side rate limit applied to every backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Fixed timer periods of the polling hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Migration advice, gain, placement, monitoring snapshot, VM details.
    pub advisory: Duration,
    /// Stress status and power history charts.
    pub telemetry: Duration,
    /// Monitoring run status, which gates start/stop buttons.
    pub status: Duration,
    /// Temperature history.
    pub temperature: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            advisory: Duration::from_secs(30),
            telemetry: Duration::from_secs(5),
            status: Duration::from_secs(3),
            temperature: Duration::from_secs(60),
        }
    }
}

/// Configuration of a [`BGreenClient`](crate::BGreenClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout of write operations (start/stop, decisions).
    pub write_timeout: Duration,
    /// Timeout of the stress status call.
    pub status_timeout: Duration,
    /// Rows requested from the maintenance and temperature history endpoints.
    pub history_len: usize,
    pub intervals: PollIntervals,
    /// `None` disables client-side rate limiting.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
            status_timeout: Duration::from_secs(5),
            history_len: 20,
            intervals: PollIntervals::default(),
            rate_limit: None,
        }
    }
}
