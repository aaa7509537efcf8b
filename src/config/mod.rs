//! QC configuration: layered loading, validation and the immutable
//! [`QcConfig`] handed to the evaluator.

pub mod settings;

pub use settings::{load_settings, QcSettings};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;
use crate::models::QuantityCode;
use crate::utils::constants::{
    DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD, DEFAULT_MARGIN, DEFAULT_REFERENCE_QUANTITY,
    TEMP_TYPE_AVG, TEMP_TYPE_MAX, TEMP_TYPE_MIN,
};

/// How a quantity is compared against its station's daily reference aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossCheck {
    /// Must not exceed the daily reference maximum plus margin
    Maximum,
    /// Must not fall below the daily reference minimum minus margin
    Minimum,
    /// Must lie within margin of the daily reference mean
    Mean,
    /// Range check only
    None,
}

impl CrossCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossCheck::Maximum => "max",
            CrossCheck::Minimum => "min",
            CrossCheck::Mean => "mean",
            CrossCheck::None => "none",
        }
    }
}

impl fmt::Display for CrossCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrossCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max" => Ok(CrossCheck::Maximum),
            "min" => Ok(CrossCheck::Minimum),
            "mean" => Ok(CrossCheck::Mean),
            "none" => Ok(CrossCheck::None),
            other => Err(other.to_string()),
        }
    }
}

/// Inclusive physical bounds; values strictly outside, and NaN, are range
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    pub low: f64,
    pub high: f64,
}

impl RangeBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Validated evaluator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QcConfig {
    pub bounds: RangeBounds,
    pub margin: f64,
    pub reference_quantity: QuantityCode,
    pub cross_checks: BTreeMap<QuantityCode, CrossCheck>,
}

impl QcConfig {
    pub fn cross_check_for(&self, quantity: &QuantityCode) -> CrossCheck {
        if quantity == &self.reference_quantity {
            return CrossCheck::None;
        }
        self.cross_checks
            .get(quantity)
            .copied()
            .unwrap_or(CrossCheck::None)
    }

    pub fn is_reference(&self, quantity: &QuantityCode) -> bool {
        quantity == &self.reference_quantity
    }
}

impl Default for QcConfig {
    fn default() -> Self {
        let cross_checks = [
            (TEMP_TYPE_MAX, CrossCheck::Maximum),
            (TEMP_TYPE_MIN, CrossCheck::Minimum),
            (TEMP_TYPE_AVG, CrossCheck::Mean),
        ]
        .into_iter()
        .map(|(code, check)| (QuantityCode::new(code), check))
        .collect();

        Self {
            bounds: RangeBounds {
                low: DEFAULT_LOW_THRESHOLD,
                high: DEFAULT_HIGH_THRESHOLD,
            },
            margin: DEFAULT_MARGIN,
            reference_quantity: QuantityCode::new(DEFAULT_REFERENCE_QUANTITY),
            cross_checks,
        }
    }
}

impl TryFrom<QcSettings> for QcConfig {
    type Error = ProcessingError;

    fn try_from(settings: QcSettings) -> Result<Self, Self::Error> {
        settings.into_config()
    }
}
