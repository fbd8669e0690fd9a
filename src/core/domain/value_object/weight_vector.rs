//! Sustainability criteria weights.
//!
//! Four integer percentages that the operator tunes before starting
//! monitoring. Slider edits keep the sum at exactly 100; manual numeric
//! entry writes a single value and leaves validity to [`WeightVector::is_valid`].

use crate::core::domain::error::ValidationError;
use serde::{Deserialize, Serialize};

const SUM_EPSILON: f64 = 0.001;

/// Identifies one of the four weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightKey {
    Energy,
    Balance,
    Overload,
    Allocation,
}

impl WeightKey {
    pub const ALL: [WeightKey; 4] = [
        WeightKey::Energy,
        WeightKey::Balance,
        WeightKey::Overload,
        WeightKey::Allocation,
    ];

    /// The three keys other than `self`, in declaration order.
    pub fn others(self) -> [WeightKey; 3] {
        let mut out = [WeightKey::Energy; 3];
        let mut i = 0;
        for key in Self::ALL {
            if key != self {
                out[i] = key;
                i += 1;
            }
        }
        out
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeightKey::Energy => "energy",
            WeightKey::Balance => "balance",
            WeightKey::Overload => "overload",
            WeightKey::Allocation => "allocation",
        }
    }
}

/// Four percentages {energy, balance, overload, allocation}, each 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WeightFields")]
pub struct WeightVector {
    energy: u8,
    balance: u8,
    overload: u8,
    allocation: u8,
}

#[derive(Deserialize)]
struct WeightFields {
    energy: u8,
    balance: u8,
    overload: u8,
    allocation: u8,
}

impl TryFrom<WeightFields> for WeightVector {
    type Error = ValidationError;

    fn try_from(fields: WeightFields) -> Result<Self, Self::Error> {
        let weights = WeightVector {
            energy: fields.energy,
            balance: fields.balance,
            overload: fields.overload,
            allocation: fields.allocation,
        };
        for (key, value) in weights.iter() {
            if value > 100 {
                return Err(ValidationError::field(
                    key.as_str(),
                    format!("weight {} is above 100", value),
                ));
            }
        }
        Ok(weights)
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            energy: 25,
            balance: 25,
            overload: 25,
            allocation: 25,
        }
    }
}

impl WeightVector {
    /// Builds a vector from explicit values.
    ///
    /// # Errors
    /// Returns a field error if any value is above 100. The sum is not
    /// checked; see [`WeightVector::is_valid`].
    pub fn new(energy: u8, balance: u8, overload: u8, allocation: u8) -> Result<Self, ValidationError> {
        Self::try_from(WeightFields {
            energy,
            balance,
            overload,
            allocation,
        })
    }

    pub fn get(&self, key: WeightKey) -> u8 {
        match key {
            WeightKey::Energy => self.energy,
            WeightKey::Balance => self.balance,
            WeightKey::Overload => self.overload,
            WeightKey::Allocation => self.allocation,
        }
    }

    fn slot(&mut self, key: WeightKey) -> &mut u8 {
        match key {
            WeightKey::Energy => &mut self.energy,
            WeightKey::Balance => &mut self.balance,
            WeightKey::Overload => &mut self.overload,
            WeightKey::Allocation => &mut self.allocation,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeightKey, u8)> + '_ {
        WeightKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }

    pub fn sum(&self) -> u32 {
        self.iter().map(|(_, v)| u32::from(v)).sum()
    }

    /// `true` when the weights add up to 100.
    pub fn is_valid(&self) -> bool {
        (f64::from(self.sum()) - 100.0).abs() < SUM_EPSILON
    }

    /// Manual numeric entry: clamps to [0, 100], rounds half up and writes
    /// only `key`. NaN leaves the vector untouched.
    pub fn set_direct(&mut self, key: WeightKey, value: f64) {
        if let Some(v) = clamp_percent(value) {
            *self.slot(key) = v;
        }
    }

    /// Manual entry from raw text: an empty field means 0, text that is not
    /// a number is ignored.
    pub fn set_direct_str(&mut self, key: WeightKey, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty() {
            self.set_direct(key, 0.0);
        } else if let Ok(value) = raw.parse::<f64>() {
            self.set_direct(key, value);
        }
    }

    /// Slider edit: sets `key` and rescales the other three so the total is
    /// exactly 100.
    ///
    /// The other keys share `100 - v` in proportion to their previous values,
    /// or evenly when they were all zero. Shares are rounded by largest
    /// remainder, earlier keys winning ties, so repeated slides never drift.
    pub fn slide(&mut self, key: WeightKey, value: f64) {
        let Some(v) = clamp_percent(value) else {
            return;
        };
        let others = key.others();
        let previous = others.map(|k| u32::from(self.get(k)));
        let remaining = 100 - u32::from(v);
        let shares = if previous.iter().sum::<u32>() > 0 {
            apportion(remaining, previous)
        } else {
            apportion(remaining, [1, 1, 1])
        };

        *self.slot(key) = v;
        for (other, share) in others.into_iter().zip(shares) {
            // share <= remaining <= 100
            *self.slot(other) = share as u8;
        }
    }
}

fn clamp_percent(value: f64) -> Option<u8> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(0.0, 100.0).round() as u8)
}

/// Splits `total` across `weights` proportionally (largest remainder method).
/// `weights` must not all be zero.
fn apportion(total: u32, weights: [u32; 3]) -> [u32; 3] {
    let denom: u32 = weights.iter().sum();
    let mut shares = weights.map(|w| total * w / denom);
    let remainders = weights.map(|w| total * w % denom);
    let mut leftover = total - shares.iter().sum::<u32>();

    let mut order = [0usize, 1, 2];
    // stable sort keeps declaration order among equal remainders
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));
    for idx in order {
        if leftover == 0 {
            break;
        }
        shares[idx] += 1;
        leftover -= 1;
    }
    shares
}
