//! Wiring of the configured data sources into a [`PricePredictor`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use estate_core::config::{AppConfig, StoreBackend};
use estate_ml::{CoefficientStore, PricePredictor, StatisticsProvider};
use estate_store::{SqliteStore, StatsSnapshot};

/// Build the predictor for the configured backend and population slice.
pub fn build_predictor(config: &AppConfig) -> Result<PricePredictor> {
    let stats: Arc<dyn StatisticsProvider>;
    let coefficients: Arc<dyn CoefficientStore>;
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = Arc::new(open_sqlite(&config.store.sqlite_path)?);
            stats = store.clone();
            coefficients = store;
        }
        StoreBackend::Snapshot => {
            let snapshot = StatsSnapshot::load(Path::new(&config.store.snapshot_path))?;
            if let Some(filter) = &snapshot.filter {
                if *filter != config.population.filter() {
                    tracing::warn!(
                        snapshot = %filter,
                        configured = %config.population.filter(),
                        "snapshot was captured for a different population slice"
                    );
                }
            }
            let snapshot = Arc::new(snapshot);
            stats = snapshot.clone();
            coefficients = snapshot;
        }
    }

    tracing::info!(
        backend = ?config.store.backend,
        filter = %config.population.filter(),
        fetch_timeout_ms = config.prediction.fetch_timeout_ms,
        "prediction backend ready"
    );

    Ok(PricePredictor::new(stats, coefficients, config.population.filter())
        .with_fetch_timeout(Duration::from_millis(config.prediction.fetch_timeout_ms)))
}

/// Capture the configured slice's statistics and the full coefficient
/// history from the SQLite store and write them to `output`.
pub async fn export_snapshot(config: &AppConfig, output: &Path) -> Result<StatsSnapshot> {
    if config.store.backend != StoreBackend::Sqlite {
        bail!("export-snapshot reads from the sqlite backend; set store.backend = \"sqlite\"");
    }
    let store = open_sqlite(&config.store.sqlite_path)?;
    let filter = config.population.filter();
    let history = store
        .coefficient_history()
        .await
        .context("failed to read coefficient history")?;
    let snapshot = StatsSnapshot::capture(&store, &filter, history)
        .await
        .context("failed to capture population statistics")?;
    snapshot.save(output)?;
    tracing::info!(
        path = %output.display(),
        %filter,
        coefficient_sets = snapshot.coefficients.len(),
        "snapshot written"
    );
    Ok(snapshot)
}

fn open_sqlite(path: &str) -> Result<SqliteStore> {
    let store = SqliteStore::open(path)?;
    store.init_schema()?;
    Ok(store)
}
