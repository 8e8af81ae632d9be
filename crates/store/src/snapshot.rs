//! JSON snapshot of one population slice's statistics and coefficient
//! history, served without a database.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use estate_core::types::{Feature, PopulationFilter, PopulationStats, RegressionCoefficients};
use estate_core::ProviderError;
use estate_ml::{CoefficientStore, StatisticsProvider};

/// Pre-computed statistics and coefficient history for one population slice.
///
/// Stored as a JSON file so a deployment can predict without access to the
/// inventory database. The slice is fixed when the snapshot is captured;
/// the filter passed to the provider methods is not consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Slice the statistics were computed over, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PopulationFilter>,
    pub features: BTreeMap<Feature, PopulationStats>,
    pub price: PopulationStats,
    #[serde(default)]
    pub coefficients: Vec<RegressionCoefficients>,
}

impl StatsSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let snapshot: StatsSnapshot = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
        let missing: Vec<&str> = Feature::ALL
            .iter()
            .filter(|f| !snapshot.features.contains_key(f))
            .map(|f| f.name())
            .collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "snapshot lacks statistics for some features");
        }
        Ok(snapshot)
    }

    /// Save the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    /// Capture the current statistics of `filter` and the full coefficient
    /// history from live providers.
    pub async fn capture(
        stats: &dyn StatisticsProvider,
        filter: &PopulationFilter,
        coefficients: Vec<RegressionCoefficients>,
    ) -> Result<Self, ProviderError> {
        let features = try_join_all(Feature::ALL.into_iter().map(|feature| async move {
            Ok::<_, ProviderError>((feature, stats.feature_statistic(feature, filter).await?))
        }))
        .await?;
        let price = stats.price_statistic(filter).await?;
        Ok(Self {
            filter: Some(filter.clone()),
            features: features.into_iter().collect(),
            price,
            coefficients,
        })
    }
}

#[async_trait]
impl StatisticsProvider for StatsSnapshot {
    async fn feature_statistic(
        &self,
        feature: Feature,
        _filter: &PopulationFilter,
    ) -> Result<PopulationStats, ProviderError> {
        Ok(self.features.get(&feature).copied().unwrap_or_default())
    }

    async fn price_statistic(&self, _filter: &PopulationFilter) -> Result<PopulationStats, ProviderError> {
        Ok(self.price)
    }
}

#[async_trait]
impl CoefficientStore for StatsSnapshot {
    async fn latest(&self) -> Result<Option<RegressionCoefficients>, ProviderError> {
        Ok(RegressionCoefficients::latest(&self.coefficients).cloned())
    }
}
