//! Domain models for migration advice and power gain.
//!
//! Covers the `gain_before`, `migration` and `gain_after` chart endpoints.

use crate::core::domain::{error::ValidationError, model::Payload};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `val_ratio` at or above this marks a migration as verified.
pub const VERIFICATION_THRESHOLD: f64 = 0.95;

/// Estimated gain of the proposed placement, before migrating.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GainEstimate {
    /// Current draw in watts.
    #[serde(rename = "cur_power")]
    pub current_power: f64,
    /// Draw in watts after the proposed migration.
    #[serde(rename = "prop_power")]
    pub proposed_power: f64,
    /// Signed fraction; positive means the proposal saves power.
    #[serde(rename = "prop_gain")]
    pub proposed_gain_ratio: f64,
}

impl GainEstimate {
    pub fn is_improvement(&self) -> bool {
        self.proposed_gain_ratio > 0.0
    }
}

impl Payload for GainEstimate {
    fn validate(&self) -> Result<(), ValidationError> {
        ensure_finite(&[
            ("cur_power", self.current_power),
            ("prop_power", self.proposed_power),
            ("prop_gain", self.proposed_gain_ratio),
        ])
    }
}

/// Measured gain after a migration ran.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GainVerification {
    pub past_power: f64,
    #[serde(rename = "cur_power")]
    pub current_power: f64,
    #[serde(rename = "prop_power")]
    pub proposed_power: f64,
    #[serde(default, rename = "prop_ratio")]
    pub proposed_ratio: f64,
    pub actual_ratio: f64,
    #[serde(rename = "val_ratio")]
    pub validation_ratio: f64,
    #[serde(default, rename = "val_difference")]
    pub validation_difference: f64,
}

impl GainVerification {
    /// `true` when the measured gain matches the estimate closely enough.
    pub fn is_verified(&self) -> bool {
        self.validation_ratio >= VERIFICATION_THRESHOLD
    }
}

impl Payload for GainVerification {
    fn validate(&self) -> Result<(), ValidationError> {
        ensure_finite(&[
            ("past_power", self.past_power),
            ("cur_power", self.current_power),
            ("prop_power", self.proposed_power),
            ("actual_ratio", self.actual_ratio),
            ("val_ratio", self.validation_ratio),
        ])
    }
}

/// A proposed reassignment of one VM.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MigrationAdvice {
    pub current_pm: String,
    pub proposed_pm: String,
}

impl MigrationAdvice {
    /// `false` when the advice keeps the VM where it is.
    pub fn is_move(&self) -> bool {
        self.current_pm != self.proposed_pm
    }
}

/// VM id to advice, in the order the backend listed them.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MigrationAdviceMap(IndexMap<String, MigrationAdvice>);

impl MigrationAdviceMap {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, vm: &str) -> Option<&MigrationAdvice> {
        self.0.get(vm)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MigrationAdvice)> {
        self.0.iter()
    }

    /// Entries that actually move a VM to another node.
    pub fn moves(&self) -> impl Iterator<Item = (&String, &MigrationAdvice)> {
        self.0.iter().filter(|(_, advice)| advice.is_move())
    }
}

impl FromIterator<(String, MigrationAdvice)> for MigrationAdviceMap {
    fn from_iter<I: IntoIterator<Item = (String, MigrationAdvice)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Payload for MigrationAdviceMap {}

/// Gain estimate and advice fetched together; never mixed across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutlook {
    pub gain: GainEstimate,
    pub advice: MigrationAdviceMap,
}

fn ensure_finite(fields: &[(&str, f64)]) -> Result<(), ValidationError> {
    for (name, value) in fields {
        if !value.is_finite() {
            return Err(ValidationError::field(*name, "must be a finite number"));
        }
    }
    Ok(())
}
