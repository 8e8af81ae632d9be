//! # estate-server
//!
//! HTTP service and command-line front end for the price predictor.

pub mod api;
pub mod backend;
pub mod metrics;
pub mod server;
