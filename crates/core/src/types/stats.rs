//! Population statistics and the standardization they define.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Feature;
use crate::error::PredictionError;

/// What a set of statistics was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatSubject {
    Feature(Feature),
    Price,
}

impl fmt::Display for StatSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatSubject::Feature(feature) => write!(f, "{feature}"),
            StatSubject::Price => f.write_str("price"),
        }
    }
}

/// Mean and standard deviation of a column over a population slice, as
/// reported by a statistics provider.
///
/// Either value is `None` when the slice is too small to define it
/// (no rows for the mean, fewer than two for the sample deviation).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationStats {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl PopulationStats {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            mean: Some(mean),
            std_dev: Some(std_dev),
        }
    }

    /// Statistics of an empty population.
    pub fn undefined() -> Self {
        Self::default()
    }
}

/// Validated statistics: finite mean, finite and strictly positive
/// standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    mean: f64,
    std_dev: f64,
}

impl Standardizer {
    /// Validate provider statistics for `subject`.
    pub fn from_stats(subject: StatSubject, stats: PopulationStats) -> Result<Self, PredictionError> {
        match (stats.mean, stats.std_dev) {
            (Some(mean), Some(std_dev)) if mean.is_finite() && std_dev.is_finite() && std_dev > 0.0 => {
                Ok(Self { mean, std_dev })
            }
            _ => Err(PredictionError::InvalidStatistics { subject }),
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// `(x - mean) / std_dev`
    #[inline]
    pub fn standardize(&self, x: f64) -> f64 {
        (x - self.mean) / self.std_dev
    }

    /// `z * std_dev + mean`
    #[inline]
    pub fn destandardize(&self, z: f64) -> f64 {
        z * self.std_dev + self.mean
    }
}
