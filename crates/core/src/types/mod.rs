//! Domain types for the price predictor.
//!
//! Everything here is a plain value: feature vectors are created per
//! request, statistics and coefficients are read-only snapshots fetched per
//! request. Nothing in this module holds shared state.

pub mod coefficients;
pub mod feature;
pub mod population;
pub mod stats;
pub mod vector;

// Re-export primary types for convenient access via `estate_core::types::*`.
pub use coefficients::{FeatureWeights, RegressionCoefficients};
pub use feature::Feature;
pub use population::{Listing, PropertyCategory, PopulationFilter};
pub use stats::{PopulationStats, StatSubject, Standardizer};
pub use vector::FeatureVector;
