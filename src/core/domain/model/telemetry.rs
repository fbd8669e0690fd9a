//! Domain models for the maintenance and temperature history charts.
//!
//! Both endpoints wrap their rows in `{"data": [...]}` and send numbers as
//! strings.

use crate::core::domain::{
    error::ValidationError,
    model::Payload,
    value_object::serde_helpers::{lenient_f64, null_as_default},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Rows of a history endpoint, oldest first.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Series<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub data: Vec<T>,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T> Series<T> {
    /// The last `n` rows (all rows if fewer).
    pub fn tail(&self, n: usize) -> &[T] {
        let start = self.data.len().saturating_sub(n);
        &self.data[start..]
    }

    pub fn latest(&self) -> Option<&T> {
        self.data.last()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One row of `/prom/get_chart_data/maintenance/{n}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MaintenanceRecord {
    pub now_timestamp: String,
    pub future_timestamp: String,
    #[serde(with = "lenient_f64")]
    pub power: f64,
    #[serde(with = "lenient_f64")]
    pub power_future_15min: f64,
    #[serde(with = "lenient_f64")]
    pub positive_3p: f64,
    #[serde(with = "lenient_f64")]
    pub negative_3p: f64,
    #[serde(with = "lenient_f64")]
    pub positive_7p: f64,
    #[serde(with = "lenient_f64")]
    pub negative_7p: f64,
    /// Categorical maintenance flag as sent by the backend.
    pub flag: String,
}

/// Where a predicted value sits relative to the ±3%/±7% bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPosition {
    Within3,
    Within7,
    Outside,
}

impl MaintenanceRecord {
    /// Classifies the 15-minute prediction against the bands of this row.
    pub fn prediction_band(&self) -> BandPosition {
        let p = self.power_future_15min;
        if p >= self.negative_3p && p <= self.positive_3p {
            BandPosition::Within3
        } else if p >= self.negative_7p && p <= self.positive_7p {
            BandPosition::Within7
        } else {
            BandPosition::Outside
        }
    }
}

pub type MaintenanceSeries = Series<MaintenanceRecord>;

impl MaintenanceSeries {
    /// Flag of the most recent row, the value the maintenance view highlights.
    pub fn current_flag(&self) -> Option<&str> {
        self.latest().map(|r| r.flag.as_str())
    }
}

impl Payload for MaintenanceSeries {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_rows(self.data.iter().map(|r| r.power))
    }
}

/// One row of `/prom/get_chart_data/temperature/{n}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TemperatureRecord {
    pub now_timestamp: String,
    pub future_timestamp: String,
    #[serde(with = "lenient_f64")]
    pub power: f64,
    #[serde(with = "lenient_f64")]
    pub power_future_15min: f64,
    #[serde(with = "lenient_f64")]
    pub env_temp_cur: f64,
    #[serde(with = "lenient_f64")]
    pub env_temp_15min: f64,
}

pub type TemperatureSeries = Series<TemperatureRecord>;

impl Payload for TemperatureSeries {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_rows(self.data.iter().map(|r| r.power))
    }
}

fn validate_rows(values: impl Iterator<Item = f64>) -> Result<(), ValidationError> {
    for value in values {
        if !value.is_finite() {
            return Err(ValidationError::field("data.power", "must be a finite number"));
        }
    }
    Ok(())
}
