//! Linear price model applied in standardized space.
//!
//! The model was fitted on standardized features against standardized
//! price, so a prediction is a linear combination of z-scores that has to
//! be mapped back to currency with the price statistics of the same
//! population slice.

use estate_core::types::{FeatureVector, PopulationStats, RegressionCoefficients, StatSubject, Standardizer};
use estate_core::PredictionError;

/// Stateless linear predictor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPredictor;

impl LinearPredictor {
    /// `intercept + Σ weight[f] * normalized[f]`, summed in feature
    /// declaration order so rounding is reproducible.
    pub fn standardized(
        normalized: &FeatureVector,
        coefficients: &RegressionCoefficients,
    ) -> Result<f64, PredictionError> {
        let mut z = coefficients.intercept;
        for (feature, weight) in coefficients.weights.iter() {
            z += weight * normalized.require(feature)?;
        }
        Ok(z)
    }

    /// Predicted price in currency units.
    ///
    /// The result is not clamped: an implausible or negative price is
    /// reported as is.
    pub fn predict(
        normalized: &FeatureVector,
        coefficients: &RegressionCoefficients,
        price_stats: PopulationStats,
    ) -> Result<f64, PredictionError> {
        let z = Self::standardized(normalized, coefficients)?;
        Self::to_price(z, price_stats)
    }

    /// Map a standardized prediction back to currency units.
    pub fn to_price(z: f64, price_stats: PopulationStats) -> Result<f64, PredictionError> {
        let price = Standardizer::from_stats(StatSubject::Price, price_stats)?;
        let predicted = price.destandardize(z);
        if !predicted.is_finite() {
            return Err(PredictionError::InvalidStatistics {
                subject: StatSubject::Price,
            });
        }
        Ok(predicted)
    }
}
