//! # estate-ml
//!
//! Inference-time price prediction: standardize a property's features
//! against population statistics, apply the active linear-regression
//! coefficients, and map the standardized result back to currency.
//!
//! - [`normalize`]: feature standardization ([`FeatureNormalizer`])
//! - [`predictor`]: the linear model ([`LinearPredictor`])
//! - [`pipeline`]: concurrent per-request orchestration ([`PricePredictor`])
//! - [`provider`]: the data-source traits the pipeline depends on

pub mod normalize;
pub mod pipeline;
pub mod predictor;
pub mod provider;

pub use normalize::{standardize_with, FeatureNormalizer};
pub use pipeline::{Prediction, PricePredictor};
pub use predictor::LinearPredictor;
pub use provider::{CoefficientStore, StatisticsProvider};
