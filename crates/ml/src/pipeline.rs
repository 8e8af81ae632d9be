//! Request-level prediction pipeline.
//!
//! [`PricePredictor`] wires the normalizer, the coefficient store and the
//! price statistics together for one request:
//!
//! ```text
//!            ┌─ feature statistics ×N ─► normalize ─┐
//! raw ──────►├─ latest coefficients ────────────────┼─► predict ─► price
//!            └─ price statistics ───────────────────┘
//! ```
//!
//! The three fetch groups are independent and run concurrently. Nothing is
//! cached: a re-fitted model or a changed population is visible on the next
//! request. Dropping the returned future abandons in-flight fetches.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::Instrument;

use estate_core::types::{FeatureVector, PopulationFilter};
use estate_core::PredictionError;

use crate::normalize::FeatureNormalizer;
use crate::predictor::LinearPredictor;
use crate::provider::{bounded, CoefficientStore, StatisticsProvider};

/// Default upper bound on each provider call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a successful prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted price in currency units.
    pub predicted_price: f64,
    /// The prediction before de-standardization.
    pub standardized: f64,
    /// Version of the coefficient set used.
    pub model_version: u64,
    /// Date the coefficient set was computed.
    pub model_date: NaiveDate,
}

/// End-to-end price prediction over pluggable data sources.
#[derive(Clone)]
pub struct PricePredictor {
    stats: Arc<dyn StatisticsProvider>,
    coefficients: Arc<dyn CoefficientStore>,
    filter: PopulationFilter,
    fetch_timeout: Duration,
}

impl PricePredictor {
    pub fn new(
        stats: Arc<dyn StatisticsProvider>,
        coefficients: Arc<dyn CoefficientStore>,
        filter: PopulationFilter,
    ) -> Self {
        Self {
            stats,
            coefficients,
            filter,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn filter(&self) -> &PopulationFilter {
        &self.filter
    }

    /// Predict the price of the property described by `raw`.
    pub async fn predict(&self, raw: &FeatureVector) -> Result<Prediction, PredictionError> {
        let span = tracing::info_span!("predict", filter = %self.filter);
        self.predict_inner(raw).instrument(span).await
    }

    async fn predict_inner(&self, raw: &FeatureVector) -> Result<Prediction, PredictionError> {
        raw.require_complete()?;

        let normalizer = FeatureNormalizer::new(Arc::clone(&self.stats), self.filter.clone(), self.fetch_timeout);

        let (normalized, coefficients, price_stats) = tokio::try_join!(
            normalizer.normalize(raw),
            bounded(self.fetch_timeout, "coefficients", self.coefficients.latest()),
            bounded(
                self.fetch_timeout,
                "price statistics",
                self.stats.price_statistic(&self.filter)
            ),
        )?;

        let coefficients = coefficients.ok_or_else(|| {
            tracing::warn!("no regression coefficients stored");
            PredictionError::CoefficientsUnavailable
        })?;

        let standardized = LinearPredictor::standardized(&normalized, &coefficients)?;
        let predicted_price = LinearPredictor::to_price(standardized, price_stats)?;

        tracing::debug!(
            model_version = coefficients.version,
            standardized,
            predicted_price,
            "prediction computed"
        );

        Ok(Prediction {
            predicted_price,
            standardized,
            model_version: coefficients.version,
            model_date: coefficients.calculated_at,
        })
    }
}
