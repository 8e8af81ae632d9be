//! In-memory inventory and coefficient history.
//!
//! Statistics are recomputed by a fold over the current listings on every
//! call, so inserts are visible to the next prediction.

use async_trait::async_trait;
use parking_lot::RwLock;

use estate_core::types::{Feature, Listing, PopulationFilter, PopulationStats, RegressionCoefficients};
use estate_core::ProviderError;
use estate_ml::{CoefficientStore, StatisticsProvider};

use crate::running::RunningStats;

/// A property inventory held in memory.
#[derive(Default)]
pub struct InMemoryInventory {
    listings: RwLock<Vec<Listing>>,
}

impl InMemoryInventory {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: RwLock::new(listings),
        }
    }

    pub fn insert(&self, listing: Listing) {
        self.listings.write().push(listing);
    }

    pub fn len(&self) -> usize {
        self.listings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fold<F>(&self, filter: &PopulationFilter, value: F) -> PopulationStats
    where
        F: Fn(&Listing) -> Option<f64>,
    {
        let listings = self.listings.read();
        listings
            .iter()
            .filter(|l| filter.matches(l))
            .filter_map(value)
            .collect::<RunningStats>()
            .stats()
    }
}

#[async_trait]
impl StatisticsProvider for InMemoryInventory {
    async fn feature_statistic(
        &self,
        feature: Feature,
        filter: &PopulationFilter,
    ) -> Result<PopulationStats, ProviderError> {
        Ok(self.fold(filter, |l| l.features.get(feature)))
    }

    async fn price_statistic(&self, filter: &PopulationFilter) -> Result<PopulationStats, ProviderError> {
        Ok(self.fold(filter, |l| Some(l.price)))
    }
}

/// Coefficient history held in memory; append-only.
#[derive(Default)]
pub struct InMemoryCoefficients {
    history: RwLock<Vec<RegressionCoefficients>>,
}

impl InMemoryCoefficients {
    pub fn new(history: Vec<RegressionCoefficients>) -> Self {
        Self {
            history: RwLock::new(history),
        }
    }

    pub fn push(&self, coefficients: RegressionCoefficients) {
        self.history.write().push(coefficients);
    }
}

#[async_trait]
impl CoefficientStore for InMemoryCoefficients {
    async fn latest(&self) -> Result<Option<RegressionCoefficients>, ProviderError> {
        Ok(RegressionCoefficients::latest(self.history.read().iter()).cloned())
    }
}
