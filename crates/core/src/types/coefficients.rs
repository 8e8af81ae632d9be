//! Fitted linear-regression coefficients.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Feature;

/// One weight per modeled feature.
///
/// A closed record: every [`Feature`] has exactly one weight and nothing
/// else can be stored, so the predictor never inspects key names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureWeights([f64; Feature::COUNT]);

impl FeatureWeights {
    pub fn zeros() -> Self {
        Self([0.0; Feature::COUNT])
    }

    pub fn from_fn(f: impl FnMut(Feature) -> f64) -> Self {
        Self(Feature::ALL.map(f))
    }

    pub fn with(mut self, feature: Feature, weight: f64) -> Self {
        self.set(feature, weight);
        self
    }

    pub fn set(&mut self, feature: Feature, weight: f64) {
        self.0[feature.index()] = weight;
    }

    #[inline]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    /// Weights in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().map(|f| (f, self.get(f)))
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::zeros()
    }
}

/// An immutable, versioned coefficient set.
///
/// The active model is the record with the latest `calculated_at`
/// (ties broken by the higher `version`); see [`RegressionCoefficients::is_newer_than`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoefficientsRecord", into = "CoefficientsRecord")]
pub struct RegressionCoefficients {
    pub version: u64,
    pub calculated_at: NaiveDate,
    pub intercept: f64,
    pub weights: FeatureWeights,
}

impl RegressionCoefficients {
    pub fn new(version: u64, calculated_at: NaiveDate, intercept: f64, weights: FeatureWeights) -> Self {
        Self {
            version,
            calculated_at,
            intercept,
            weights,
        }
    }

    /// Ordering used to select the active model.
    pub fn is_newer_than(&self, other: &RegressionCoefficients) -> bool {
        (self.calculated_at, self.version) > (other.calculated_at, other.version)
    }

    /// Pick the active model out of a history.
    pub fn latest<'a, I>(history: I) -> Option<&'a RegressionCoefficients>
    where
        I: IntoIterator<Item = &'a RegressionCoefficients>,
    {
        history
            .into_iter()
            .max_by_key(|c| (c.calculated_at, c.version))
    }
}

/// Flat wire shape: `{ version, calculatedAt, intercept, sqMeters, ... }`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoefficientsRecord {
    version: u64,
    calculated_at: NaiveDate,
    intercept: f64,
    #[serde(flatten)]
    weights: BTreeMap<String, f64>,
}

impl TryFrom<CoefficientsRecord> for RegressionCoefficients {
    type Error = String;

    fn try_from(record: CoefficientsRecord) -> Result<Self, Self::Error> {
        let mut weights = FeatureWeights::zeros();
        for feature in Feature::ALL {
            let weight = record
                .weights
                .get(feature.name())
                .copied()
                .ok_or_else(|| format!("coefficient set has no weight for `{feature}`"))?;
            weights.set(feature, weight);
        }
        if let Some(unknown) = record.weights.keys().find(|k| Feature::from_name(k).is_none()) {
            return Err(format!("unknown coefficient `{unknown}`"));
        }
        Ok(Self::new(record.version, record.calculated_at, record.intercept, weights))
    }
}

impl From<RegressionCoefficients> for CoefficientsRecord {
    fn from(c: RegressionCoefficients) -> Self {
        Self {
            version: c.version,
            calculated_at: c.calculated_at,
            intercept: c.intercept,
            weights: c
                .weights
                .iter()
                .map(|(f, w)| (f.name().to_string(), w))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, d).unwrap()
    }

    #[test]
    fn test_latest_by_date_then_version() {
        let a = RegressionCoefficients::new(1, date(1), 0.0, FeatureWeights::zeros());
        let b = RegressionCoefficients::new(2, date(3), 0.0, FeatureWeights::zeros());
        let c = RegressionCoefficients::new(3, date(3), 0.0, FeatureWeights::zeros());
        let d = RegressionCoefficients::new(9, date(2), 0.0, FeatureWeights::zeros());
        let history = vec![a, c.clone(), b.clone(), d];
        assert_eq!(RegressionCoefficients::latest(&history), Some(&c));
        assert!(c.is_newer_than(&b));
        assert!(!b.is_newer_than(&c));
        assert_eq!(RegressionCoefficients::latest(&Vec::new()), None);
    }

    #[test]
    fn test_weights_iter_order() {
        let w = FeatureWeights::from_fn(|f| f.index() as f64);
        for (i, (feature, weight)) in w.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(weight, i as f64);
        }
    }

    #[test]
    fn test_json_is_flat() {
        let c = RegressionCoefficients::new(
            4,
            date(10),
            0.25,
            FeatureWeights::zeros().with(Feature::SqMeters, 0.8),
        );
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["version"], 4);
        assert_eq!(json["calculatedAt"], "2023-06-10");
        assert_eq!(json["intercept"], 0.25);
        assert_eq!(json["sqMeters"], 0.8);
        assert_eq!(json["garden"], 0.0);

        let back: RegressionCoefficients = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_json_requires_every_weight() {
        let mut json = serde_json::to_value(RegressionCoefficients::new(
            1,
            date(1),
            0.0,
            FeatureWeights::zeros(),
        ))
        .unwrap();
        json.as_object_mut().unwrap().remove("garden");
        let err = serde_json::from_value::<RegressionCoefficients>(json).unwrap_err();
        assert!(err.to_string().contains("garden"), "{err}");
    }

    #[test]
    fn test_json_rejects_unknown_weight() {
        let mut json = serde_json::to_value(RegressionCoefficients::new(
            1,
            date(1),
            0.0,
            FeatureWeights::zeros(),
        ))
        .unwrap();
        json["landArea"] = serde_json::json!(0.1);
        assert!(serde_json::from_value::<RegressionCoefficients>(json).is_err());
    }
}
