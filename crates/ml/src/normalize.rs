//! Feature standardization against population statistics.
//!
//! [`FeatureNormalizer`] fetches `{mean, std_dev}` for every feature of the
//! input from a [`StatisticsProvider`] and replaces each raw value with its
//! z-score. The fetches are independent and issued concurrently; results are
//! applied in feature declaration order.
//!
//! Statistics that would produce NaN or infinity (undefined mean, zero or
//! negative deviation, or a deviation so small the z-score overflows) are
//! rejected with [`PredictionError::InvalidStatistics`] naming the feature,
//! instead of being propagated.
//!
//! Every feature is standardized, the 0/1 indicators included. Coefficients
//! must therefore be fitted on standardized indicators too, and an amenity
//! that is constant across the population slice (zero deviation) makes the
//! slice unusable for prediction until the inventory varies again.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;

use estate_core::types::{
    Feature, FeatureVector, PopulationFilter, PopulationStats, StatSubject, Standardizer,
};
use estate_core::PredictionError;

use crate::provider::{bounded, StatisticsProvider};

/// Standardize `raw` with statistics looked up per feature.
///
/// Pure and synchronous. The output has the same key set as the input.
pub fn standardize_with<F>(raw: &FeatureVector, mut stats_for: F) -> Result<FeatureVector, PredictionError>
where
    F: FnMut(Feature) -> PopulationStats,
{
    let mut out = FeatureVector::new();
    for (feature, value) in raw.iter() {
        if !value.is_finite() {
            return Err(PredictionError::InvalidFeatureValue { feature });
        }
        let subject = StatSubject::Feature(feature);
        let z = Standardizer::from_stats(subject, stats_for(feature))?.standardize(value);
        if !z.is_finite() {
            return Err(PredictionError::InvalidStatistics { subject });
        }
        out.set(feature, z);
    }
    Ok(out)
}

/// Converts raw feature vectors into standardized ones.
#[derive(Clone)]
pub struct FeatureNormalizer {
    provider: Arc<dyn StatisticsProvider>,
    filter: PopulationFilter,
    fetch_timeout: Duration,
}

impl FeatureNormalizer {
    pub fn new(provider: Arc<dyn StatisticsProvider>, filter: PopulationFilter, fetch_timeout: Duration) -> Self {
        Self {
            provider,
            filter,
            fetch_timeout,
        }
    }

    pub fn filter(&self) -> &PopulationFilter {
        &self.filter
    }

    /// Standardize every modeled feature of `raw`.
    ///
    /// Fails with `MissingFeature` before any statistics are requested if
    /// `raw` is incomplete.
    pub async fn normalize(&self, raw: &FeatureVector) -> Result<FeatureVector, PredictionError> {
        raw.require_complete()?;
        let stats = self.fetch_all().await?;
        standardize_with(raw, |feature| stats[feature.index()])
    }

    /// Fan out one statistics request per feature and collect them in
    /// declaration order.
    async fn fetch_all(&self) -> Result<Vec<PopulationStats>, PredictionError> {
        let fetches = Feature::ALL.into_iter().map(|feature| {
            let provider = Arc::clone(&self.provider);
            let filter = &self.filter;
            async move {
                let stats = bounded(
                    self.fetch_timeout,
                    "feature statistics",
                    provider.feature_statistic(feature, filter),
                )
                .await?;
                tracing::trace!(%feature, mean = ?stats.mean, std_dev = ?stats.std_dev, "feature statistics");
                Ok::<_, PredictionError>(stats)
            }
        });
        try_join_all(fetches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use estate_core::ProviderError;

    /// Provider with fixed per-feature statistics; unknown features get
    /// mean 0, std 1.
    #[derive(Default)]
    struct FixedStats {
        features: HashMap<Feature, PopulationStats>,
        calls: AtomicUsize,
    }

    impl FixedStats {
        fn with(mut self, feature: Feature, stats: PopulationStats) -> Self {
            self.features.insert(feature, stats);
            self
        }
    }

    #[async_trait]
    impl StatisticsProvider for FixedStats {
        async fn feature_statistic(
            &self,
            feature: Feature,
            _filter: &PopulationFilter,
        ) -> Result<PopulationStats, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .features
                .get(&feature)
                .copied()
                .unwrap_or(PopulationStats::new(0.0, 1.0)))
        }

        async fn price_statistic(&self, _filter: &PopulationFilter) -> Result<PopulationStats, ProviderError> {
            Ok(PopulationStats::new(0.0, 1.0))
        }
    }

    fn normalizer(provider: Arc<FixedStats>) -> FeatureNormalizer {
        FeatureNormalizer::new(provider, PopulationFilter::default(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_mean_maps_to_zero_and_sigma_to_one() {
        let provider = Arc::new(FixedStats::default().with(Feature::SqMeters, PopulationStats::new(50.0, 10.0)));
        let n = normalizer(provider);

        let at_mean = n.normalize(&FeatureVector::filled(0.0).with(Feature::SqMeters, 50.0)).await.unwrap();
        assert_eq!(at_mean.get(Feature::SqMeters), Some(0.0));

        let one_sigma = n.normalize(&FeatureVector::filled(0.0).with(Feature::SqMeters, 60.0)).await.unwrap();
        assert_eq!(one_sigma.get(Feature::SqMeters), Some(1.0));
    }

    #[tokio::test]
    async fn test_output_has_same_keys_and_is_invertible() {
        let provider = Arc::new(
            FixedStats::default()
                .with(Feature::YearBuilt, PopulationStats::new(1985.0, 22.5))
                .with(Feature::MlBelgradeDistance, PopulationStats::new(6.2, 3.1)),
        );
        let raw = FeatureVector::filled(1.0)
            .with(Feature::YearBuilt, 2011.0)
            .with(Feature::MlBelgradeDistance, 2.4);
        let out = normalizer(Arc::clone(&provider)).normalize(&raw).await.unwrap();

        assert_eq!(out.len(), raw.len());
        for (feature, z) in out.iter() {
            let stats = provider.features.get(&feature).copied().unwrap_or(PopulationStats::new(0.0, 1.0));
            let s = Standardizer::from_stats(StatSubject::Feature(feature), stats).unwrap();
            let back = s.destandardize(z);
            assert!((back - raw.get(feature).unwrap()).abs() < 1e-9, "{feature}");
        }
    }

    #[tokio::test]
    async fn test_fetches_one_statistic_per_feature() {
        let provider = Arc::new(FixedStats::default());
        normalizer(Arc::clone(&provider)).normalize(&FeatureVector::filled(0.0)).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), Feature::COUNT);
    }

    #[tokio::test]
    async fn test_zero_variance_rejected() {
        let provider = Arc::new(FixedStats::default().with(Feature::Pool, PopulationStats::new(0.0, 0.0)));
        let err = normalizer(provider).normalize(&FeatureVector::filled(1.0)).await.unwrap_err();
        match err {
            PredictionError::InvalidStatistics { subject } => {
                assert_eq!(subject, StatSubject::Feature(Feature::Pool))
            }
            other => panic!("expected InvalidStatistics, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_population_rejected() {
        let provider = Arc::new(FixedStats::default().with(Feature::Floor, PopulationStats::undefined()));
        let err = normalizer(provider).normalize(&FeatureVector::filled(1.0)).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_statistics");
    }

    #[tokio::test]
    async fn test_missing_feature_fails_before_fetching() {
        let provider = Arc::new(FixedStats::default());
        let mut raw = FeatureVector::filled(0.0);
        raw.remove(Feature::NumOfBathrooms);

        let err = normalizer(Arc::clone(&provider)).normalize(&raw).await.unwrap_err();
        assert_eq!(err.feature(), Some(Feature::NumOfBathrooms));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_standardize_with_rejects_non_finite_input() {
        let raw = FeatureVector::new().with(Feature::SqMeters, f64::NAN);
        let err = standardize_with(&raw, |_| PopulationStats::new(0.0, 1.0)).unwrap_err();
        assert_eq!(err.kind(), "invalid_feature_value");
    }

    #[test]
    fn test_subnormal_deviation_rejected() {
        let raw = FeatureVector::new().with(Feature::Pool, 1.0);
        let err = standardize_with(&raw, |_| PopulationStats::new(0.0, 1e-310)).unwrap_err();
        match err {
            PredictionError::InvalidStatistics { subject } => {
                assert_eq!(subject, StatSubject::Feature(Feature::Pool))
            }
            other => panic!("expected InvalidStatistics, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_difference_rejected() {
        let raw = FeatureVector::new().with(Feature::SqMeters, f64::MAX);
        let err = standardize_with(&raw, |_| PopulationStats::new(-f64::MAX, 1.0)).unwrap_err();
        assert_eq!(err.feature(), Some(Feature::SqMeters));
    }

    #[test]
    fn test_standardize_with_keeps_partial_key_set() {
        let raw = FeatureVector::new().with(Feature::SqMeters, 70.0);
        let out = standardize_with(&raw, |_| PopulationStats::new(50.0, 10.0)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(Feature::SqMeters), Some(2.0));
    }
}
