//! # estate-store
//!
//! Implementations of the [`StatisticsProvider`](estate_ml::StatisticsProvider)
//! and [`CoefficientStore`](estate_ml::CoefficientStore) traits:
//!
//! - [`SqliteStore`]: inventory and coefficient tables in SQLite
//! - [`InMemoryInventory`] / [`InMemoryCoefficients`]: folds over in-memory data
//! - [`StatsSnapshot`]: pre-computed statistics in a JSON file

pub mod memory;
pub mod running;
pub mod snapshot;
pub mod sqlite;

pub use memory::{InMemoryCoefficients, InMemoryInventory};
pub use running::RunningStats;
pub use snapshot::StatsSnapshot;
pub use sqlite::SqliteStore;
