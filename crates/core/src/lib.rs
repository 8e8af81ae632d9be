//! # estate-core
//!
//! Shared types, error taxonomy, configuration and logging for the
//! property price predictor.
//!
//! This crate provides the foundational building blocks used across the
//! workspace: the closed feature set and feature vectors, population
//! filters and statistics, versioned regression coefficients, the
//! [`PredictionError`](error::PredictionError) taxonomy, layered
//! configuration, and tracing initialization.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{PredictionError, ProviderError};
