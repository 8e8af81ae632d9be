//! Population slices and inventory listings.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Feature, FeatureVector};

/// Housing category of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCategory {
    House,
    Apartment,
}

impl PropertyCategory {
    /// Value stored in the inventory's `type` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            PropertyCategory::House => "house",
            PropertyCategory::Apartment => "apartment",
        }
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of the inventory population statistics are computed over.
///
/// Passed explicitly to every statistics query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationFilter {
    /// Housing category.
    pub category: PropertyCategory,
    /// `true` for sale listings, `false` for rentals.
    pub for_sale: bool,
    /// Only listings still marked enabled.
    pub enabled_only: bool,
    /// Only listings geocoded to a municipality the model knows about.
    pub require_ml_location: bool,
}

impl Default for PopulationFilter {
    /// Enabled apartments for sale with a model location.
    fn default() -> Self {
        Self {
            category: PropertyCategory::Apartment,
            for_sale: true,
            enabled_only: true,
            require_ml_location: true,
        }
    }
}

impl PopulationFilter {
    /// Whether `listing` belongs to this slice.
    pub fn matches(&self, listing: &Listing) -> bool {
        (!self.enabled_only || listing.enabled)
            && listing.category == self.category
            && listing.for_sale == self.for_sale
            && (!self.require_ml_location || listing.ml_municipality.is_some())
    }
}

impl fmt::Display for PopulationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.category,
            if self.for_sale { "sale" } else { "rent" }
        )?;
        if self.enabled_only {
            f.write_str("/enabled")?;
        }
        if self.require_ml_location {
            f.write_str("/ml-located")?;
        }
        Ok(())
    }
}

/// One row of the property inventory.
///
/// Feature values are optional: scraped listings frequently lack some
/// attributes, and absent values do not contribute to statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: String,
    pub enabled: bool,
    pub for_sale: bool,
    pub category: PropertyCategory,
    pub ml_municipality: Option<String>,
    pub price: f64,
    pub features: FeatureVector,
}

impl Listing {
    /// An enabled apartment for sale located in `municipality`.
    pub fn apartment(id: impl Into<String>, municipality: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            for_sale: true,
            category: PropertyCategory::Apartment,
            ml_municipality: Some(municipality.into()),
            price,
            features: FeatureVector::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature, value: f64) -> Self {
        self.features.set(feature, value);
        self
    }
}
