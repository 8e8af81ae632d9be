//! Feature vectors keyed by [`Feature`].

use std::fmt;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::Feature;
use crate::error::PredictionError;

/// A mapping from modeled features to numeric values.
///
/// Backed by a fixed-size array indexed by [`Feature::index`], so iteration
/// is always in declaration order. A slot may be empty: callers build
/// vectors incrementally and the pipeline rejects incomplete ones with
/// [`PredictionError::MissingFeature`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    values: [Option<f64>; Feature::COUNT],
}

impl FeatureVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vector with every feature set to `value`.
    pub fn filled(value: f64) -> Self {
        Self {
            values: [Some(value); Feature::COUNT],
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = Some(value);
    }

    /// Set a boolean indicator as 0/1.
    pub fn set_flag(&mut self, feature: Feature, flag: bool) {
        self.set(feature, if flag { 1.0 } else { 0.0 });
    }

    pub fn remove(&mut self, feature: Feature) -> Option<f64> {
        self.values[feature.index()].take()
    }

    #[inline]
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values[feature.index()]
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.get(feature).is_some()
    }

    /// Number of features present.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present features and their values, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|v| (f, v)))
    }

    /// Ensure every modeled feature is present.
    ///
    /// Reports the first absent feature in declaration order.
    pub fn require_complete(&self) -> Result<(), PredictionError> {
        match Feature::ALL.into_iter().find(|f| !self.contains(*f)) {
            Some(feature) => Err(PredictionError::MissingFeature { feature }),
            None => Ok(()),
        }
    }

    /// Value of `feature`, or `MissingFeature` if absent.
    pub fn require(&self, feature: Feature) -> Result<f64, PredictionError> {
        self.get(feature)
            .ok_or(PredictionError::MissingFeature { feature })
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

/// A feature value on the wire: a number, or an indicator flag.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Number(f64),
    Flag(bool),
}

struct FeatureVectorVisitor;

impl<'de> Visitor<'de> for FeatureVectorVisitor {
    type Value = FeatureVector;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of feature names to numbers or booleans")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FeatureVector, A::Error> {
        let mut vector = FeatureVector::new();
        while let Some(name) = map.next_key::<String>()? {
            let Some(feature) = Feature::from_name(&name) else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };
            match map.next_value::<Option<WireValue>>()? {
                Some(WireValue::Number(value)) => vector.set(feature, value),
                Some(WireValue::Flag(flag)) => vector.set_flag(feature, flag),
                None => {}
            }
        }
        Ok(vector)
    }
}

impl<'de> Deserialize<'de> for FeatureVector {
    /// Keys that are not feature names are ignored whatever their value;
    /// `null` leaves a feature unset and booleans become 0/1.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FeatureVectorVisitor)
    }
}

impl FromIterator<(Feature, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (Feature, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (feature, value) in iter {
            vector.set(feature, value);
        }
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_filled() {
        assert!(FeatureVector::new().is_empty());
        let full = FeatureVector::filled(0.0);
        assert_eq!(full.len(), Feature::COUNT);
        assert!(full.require_complete().is_ok());
    }

    #[test]
    fn test_require_complete_reports_first_missing() {
        let mut v = FeatureVector::filled(1.0);
        v.remove(Feature::Garden);
        v.remove(Feature::Pool);
        match v.require_complete() {
            Err(PredictionError::MissingFeature { feature }) => assert_eq!(feature, Feature::Pool),
            other => panic!("expected MissingFeature, got {other:?}"),
        }
    }

    #[test]
    fn test_iter_declaration_order() {
        let v = FeatureVector::new()
            .with(Feature::Reception, 1.0)
            .with(Feature::SqMeters, 70.0)
            .with(Feature::MlBelgradeDistance, 3.5);
        let order: Vec<_> = v.iter().map(|(f, _)| f).collect();
        assert_eq!(
            order,
            vec![Feature::MlBelgradeDistance, Feature::SqMeters, Feature::Reception]
        );
    }

    #[test]
    fn test_set_flag() {
        let mut v = FeatureVector::new();
        v.set_flag(Feature::Elevator, true);
        v.set_flag(Feature::Garage, false);
        assert_eq!(v.get(Feature::Elevator), Some(1.0));
        assert_eq!(v.get(Feature::Garage), Some(0.0));
    }

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let json = r#"{"sqMeters": 70, "garden": 1, "extraMetric": 5}"#;
        let v: FeatureVector = serde_json::from_str(json).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get(Feature::SqMeters), Some(70.0));
        assert_eq!(v.get(Feature::Garden), Some(1.0));
    }

    #[test]
    fn test_deserialize_skips_non_numeric_metadata_and_nulls() {
        let json = r#"{"sqMeters": 70, "municipality": "Vracar", "tags": ["new"], "floor": null, "elevator": true}"#;
        let v: FeatureVector = serde_json::from_str(json).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get(Feature::SqMeters), Some(70.0));
        assert_eq!(v.get(Feature::Elevator), Some(1.0));
        assert_eq!(v.get(Feature::Floor), None);
    }

    #[test]
    fn test_deserialize_rejects_text_for_feature() {
        let json = r#"{"yearBuilt": "1978"}"#;
        assert!(serde_json::from_str::<FeatureVector>(json).is_err());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let v = FeatureVector::new().with(Feature::AirCon, 1.0);
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json, serde_json::json!({ "airCon": 1.0 }));
    }
}
