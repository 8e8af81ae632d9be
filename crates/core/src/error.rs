//! Error taxonomy of the prediction pipeline.
//!
//! Every error is local to one request. The variants are distinguishable by
//! callers: bad input ([`MissingFeature`](PredictionError::MissingFeature),
//! [`InvalidFeatureValue`](PredictionError::InvalidFeatureValue)), a model
//! that is not ready yet, data problems in the population, and transient
//! provider failures.

use thiserror::Error;

use crate::types::{Feature, StatSubject};

/// Failure of a data source (statistics provider or coefficient store).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The backing store could not be queried.
    #[error("query failed: {0}")]
    Query(String),
    /// The backing store returned data that could not be decoded.
    #[error("corrupt data: {0}")]
    Corrupt(String),
}

/// Reason a prediction request failed.
#[derive(Debug, Clone, Error)]
pub enum PredictionError {
    /// A required feature is absent from the input, or the coefficient set
    /// references a feature the normalized vector lacks.
    #[error("missing feature `{feature}`")]
    MissingFeature { feature: Feature },
    /// A supplied feature value is not a finite number.
    #[error("invalid value for feature `{feature}`")]
    InvalidFeatureValue { feature: Feature },
    /// Population mean/standard deviation is undefined, non-finite, or the
    /// deviation is not strictly positive; also raised when standardizing
    /// against otherwise valid statistics overflows.
    #[error("invalid population statistics for `{subject}`")]
    InvalidStatistics { subject: StatSubject },
    /// No regression model has been computed yet.
    #[error("no regression coefficients available")]
    CoefficientsUnavailable,
    /// A statistics provider or coefficient store failed.
    #[error("provider unavailable: {message}")]
    ProviderUnavailable { message: String },
    /// A statistics provider or coefficient store did not answer in time.
    #[error("provider timed out during {operation}")]
    ProviderTimeout { operation: &'static str },
}

impl PredictionError {
    /// Stable machine-readable kind, used in error payloads and metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            PredictionError::MissingFeature { .. } => "missing_feature",
            PredictionError::InvalidFeatureValue { .. } => "invalid_feature_value",
            PredictionError::InvalidStatistics { .. } => "invalid_statistics",
            PredictionError::CoefficientsUnavailable => "coefficients_unavailable",
            PredictionError::ProviderUnavailable { .. } => "provider_unavailable",
            PredictionError::ProviderTimeout { .. } => "provider_timeout",
        }
    }

    /// All kinds, in a fixed order.
    pub const KINDS: [&'static str; 6] = [
        "missing_feature",
        "invalid_feature_value",
        "invalid_statistics",
        "coefficients_unavailable",
        "provider_unavailable",
        "provider_timeout",
    ];

    /// Feature implicated by the error, if any.
    pub fn feature(&self) -> Option<Feature> {
        match self {
            PredictionError::MissingFeature { feature }
            | PredictionError::InvalidFeatureValue { feature }
            | PredictionError::InvalidStatistics {
                subject: StatSubject::Feature(feature),
            } => Some(*feature),
            _ => None,
        }
    }

    /// Whether retrying the same request later may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            PredictionError::ProviderUnavailable { .. } | PredictionError::ProviderTimeout { .. }
        )
    }
}

impl From<ProviderError> for PredictionError {
    fn from(err: ProviderError) -> Self {
        PredictionError::ProviderUnavailable {
            message: err.to_string(),
        }
    }
}
