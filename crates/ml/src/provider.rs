//! Data sources the prediction pipeline reads from.
//!
//! Both traits are read-only and stateless from the caller's point of view:
//! every call returns the current value, and the pipeline never caches
//! results across requests. Implementations live in `estate-store`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use estate_core::types::{Feature, PopulationFilter, PopulationStats, RegressionCoefficients};
use estate_core::{PredictionError, ProviderError};

/// Population mean and standard deviation per feature and for price.
///
/// Statistics are the mean and the sample standard deviation over the
/// listings selected by `filter`. An empty population yields
/// [`PopulationStats::undefined`] rather than an error.
#[async_trait]
pub trait StatisticsProvider: Send + Sync {
    async fn feature_statistic(
        &self,
        feature: Feature,
        filter: &PopulationFilter,
    ) -> Result<PopulationStats, ProviderError>;

    async fn price_statistic(&self, filter: &PopulationFilter) -> Result<PopulationStats, ProviderError>;
}

/// Source of fitted regression coefficients.
#[async_trait]
pub trait CoefficientStore: Send + Sync {
    /// The most recently computed coefficient set, or `None` if no model
    /// has been fitted yet.
    async fn latest(&self) -> Result<Option<RegressionCoefficients>, ProviderError>;
}

/// Await a provider call under a deadline, mapping failures into the
/// pipeline's error taxonomy.
pub(crate) async fn bounded<T, F>(
    deadline: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, PredictionError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            tracing::warn!(operation, error = %err, "provider call failed");
            Err(err.into())
        }
        Err(_) => {
            tracing::warn!(operation, ?deadline, "provider call timed out");
            Err(PredictionError::ProviderTimeout { operation })
        }
    }
}
