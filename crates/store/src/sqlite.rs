//! SQLite-backed inventory and coefficient table.
//!
//! Two tables:
//! - `property`: one row per listing, one nullable column per feature
//!   (indicators stored as 0/1), plus the columns the population filter
//!   reads (`enabled`, `for_sale`, `type`, `ml_municipality`).
//! - `linear_regression`: append-only coefficient history, one column per
//!   feature weight.
//!
//! Statistics mirror Postgres `AVG` / `STDDEV` (sample deviation): the mean
//! is queried first, then the sum of squared deviations from it. rusqlite
//! is blocking, so every query runs on the blocking thread pool.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use estate_core::types::{
    Feature, FeatureWeights, Listing, PopulationFilter, PopulationStats, RegressionCoefficients,
};
use estate_core::ProviderError;
use estate_ml::{CoefficientStore, StatisticsProvider};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inventory and coefficient history in one SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database {}", path.display()))?;
        tracing::info!(path = %path.display(), "opened inventory database");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite database")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create both tables if they do not exist.
    pub fn init_schema(&self) -> Result<()> {
        let feature_columns = |ty: &str| {
            Feature::ALL
                .iter()
                .map(|f| format!("    \"{}\" REAL{ty}", f.column()))
                .collect::<Vec<_>>()
                .join(",\n")
        };
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS property (
    id TEXT PRIMARY KEY,
    enabled INTEGER NOT NULL DEFAULT 1,
    for_sale INTEGER NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('house', 'apartment')),
    ml_municipality TEXT,
    price REAL NOT NULL,
{}
);
CREATE TABLE IF NOT EXISTS linear_regression (
    version INTEGER PRIMARY KEY,
    date_calculated TEXT NOT NULL,
    intercept REAL NOT NULL,
{}
);",
            feature_columns(""),
            feature_columns(" NOT NULL"),
        );
        self.conn
            .lock()
            .execute_batch(&sql)
            .context("failed to create schema")
    }

    pub fn insert_listing(&self, listing: &Listing) -> Result<()> {
        let columns: Vec<String> = Feature::ALL.iter().map(|f| format!("\"{}\"", f.column())).collect();
        let placeholders: Vec<String> = (1..=6 + Feature::COUNT).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO property (id, enabled, for_sale, type, ml_municipality, price, {}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut values = vec![
            Value::Text(listing.id.clone()),
            Value::Integer(listing.enabled as i64),
            Value::Integer(listing.for_sale as i64),
            Value::Text(listing.category.as_str().to_string()),
            listing
                .ml_municipality
                .clone()
                .map_or(Value::Null, Value::Text),
            Value::Real(listing.price),
        ];
        values.extend(
            Feature::ALL
                .iter()
                .map(|f| listing.features.get(*f).map_or(Value::Null, Value::Real)),
        );

        self.conn
            .lock()
            .execute(&sql, params_from_iter(values))
            .with_context(|| format!("failed to insert listing {}", listing.id))?;
        Ok(())
    }

    pub fn insert_coefficients(&self, coefficients: &RegressionCoefficients) -> Result<()> {
        let columns: Vec<String> = Feature::ALL.iter().map(|f| format!("\"{}\"", f.column())).collect();
        let placeholders: Vec<String> = (1..=3 + Feature::COUNT).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO linear_regression (version, date_calculated, intercept, {}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut values = vec![
            Value::Integer(coefficients.version as i64),
            Value::Text(coefficients.calculated_at.format(DATE_FORMAT).to_string()),
            Value::Real(coefficients.intercept),
        ];
        values.extend(coefficients.weights.iter().map(|(_, w)| Value::Real(w)));

        self.conn
            .lock()
            .execute(&sql, params_from_iter(values))
            .with_context(|| format!("failed to insert coefficients v{}", coefficients.version))?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, ProviderError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ProviderError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&*guard)
        })
        .await
        .map_err(|e| ProviderError::Query(format!("sqlite worker failed: {e}")))?
    }

    /// Every stored coefficient set, oldest version first.
    pub async fn coefficient_history(&self) -> Result<Vec<RegressionCoefficients>, ProviderError> {
        self.with_conn(coefficient_history).await
    }

    async fn column_stats(&self, column: &'static str, filter: &PopulationFilter) -> Result<PopulationStats, ProviderError> {
        let filter = filter.clone();
        self.with_conn(move |conn| column_stats(conn, column, &filter)).await
    }
}

/// `WHERE` clause and its parameters for a population slice.
fn filter_clause(filter: &PopulationFilter) -> (String, Vec<Value>) {
    let mut clause = String::from("type = ?1 AND for_sale = ?2");
    if filter.enabled_only {
        clause.push_str(" AND enabled = 1");
    }
    if filter.require_ml_location {
        clause.push_str(" AND ml_municipality IS NOT NULL");
    }
    let params = vec![
        Value::Text(filter.category.as_str().to_string()),
        Value::Integer(filter.for_sale as i64),
    ];
    (clause, params)
}

fn query_err(e: rusqlite::Error) -> ProviderError {
    ProviderError::Query(e.to_string())
}

fn column_stats(conn: &Connection, column: &str, filter: &PopulationFilter) -> Result<PopulationStats, ProviderError> {
    let (clause, params) = filter_clause(filter);

    let mean_sql = format!("SELECT COUNT(\"{column}\"), AVG(\"{column}\") FROM property WHERE {clause}");
    let (count, mean): (i64, Option<f64>) = conn
        .query_row(&mean_sql, params_from_iter(params.iter()), |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(query_err)?;

    let Some(mean) = mean else {
        return Ok(PopulationStats::undefined());
    };
    if count < 2 {
        return Ok(PopulationStats {
            mean: Some(mean),
            std_dev: None,
        });
    }

    let ss_sql = format!(
        "SELECT SUM((\"{column}\" - ?3) * (\"{column}\" - ?3)) FROM property WHERE {clause} AND \"{column}\" IS NOT NULL"
    );
    let mut ss_params = params;
    ss_params.push(Value::Real(mean));
    let sum_sq: f64 = conn
        .query_row(&ss_sql, params_from_iter(ss_params.iter()), |row| row.get(0))
        .map_err(query_err)?;

    tracing::trace!(column, count, mean, sum_sq, "column statistics");
    Ok(PopulationStats {
        mean: Some(mean),
        std_dev: Some((sum_sq / (count - 1) as f64).sqrt()),
    })
}

type CoefficientRow = (i64, String, f64, FeatureWeights);

fn coefficient_sql(tail: &str) -> String {
    let columns: Vec<String> = Feature::ALL.iter().map(|f| format!("\"{}\"", f.column())).collect();
    format!(
        "SELECT version, date_calculated, intercept, {} FROM linear_regression {tail}",
        columns.join(", ")
    )
}

fn read_coefficient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CoefficientRow> {
    let version: i64 = row.get(0)?;
    let date: String = row.get(1)?;
    let intercept: f64 = row.get(2)?;
    let mut weights = FeatureWeights::zeros();
    for feature in Feature::ALL {
        weights.set(feature, row.get(3 + feature.index())?);
    }
    Ok((version, date, intercept, weights))
}

fn decode_coefficients((version, date, intercept, weights): CoefficientRow) -> Result<RegressionCoefficients, ProviderError> {
    let calculated_at = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| ProviderError::Corrupt(format!("date_calculated `{date}`: {e}")))?;
    let version = u64::try_from(version)
        .map_err(|_| ProviderError::Corrupt(format!("negative coefficient version {version}")))?;
    Ok(RegressionCoefficients::new(version, calculated_at, intercept, weights))
}

fn latest_coefficients(conn: &Connection) -> Result<Option<RegressionCoefficients>, ProviderError> {
    let sql = coefficient_sql("ORDER BY date_calculated DESC, version DESC LIMIT 1");
    conn.query_row(&sql, [], read_coefficient_row)
        .optional()
        .map_err(query_err)?
        .map(decode_coefficients)
        .transpose()
}

fn coefficient_history(conn: &Connection) -> Result<Vec<RegressionCoefficients>, ProviderError> {
    let sql = coefficient_sql("ORDER BY version");
    let mut stmt = conn.prepare(&sql).map_err(query_err)?;
    let rows = stmt.query_map([], read_coefficient_row).map_err(query_err)?;
    let history = rows
        .map(|row| decode_coefficients(row.map_err(query_err)?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

#[async_trait]
impl StatisticsProvider for SqliteStore {
    async fn feature_statistic(
        &self,
        feature: Feature,
        filter: &PopulationFilter,
    ) -> Result<PopulationStats, ProviderError> {
        self.column_stats(feature.column(), filter).await
    }

    async fn price_statistic(&self, filter: &PopulationFilter) -> Result<PopulationStats, ProviderError> {
        self.column_stats("price", filter).await
    }
}

#[async_trait]
impl CoefficientStore for SqliteStore {
    async fn latest(&self) -> Result<Option<RegressionCoefficients>, ProviderError> {
        self.with_conn(latest_coefficients).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::types::PropertyCategory;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 7, d).unwrap()
    }

    #[test]
    fn test_init_schema_idempotent() {
        let s = store();
        s.init_schema().unwrap();
    }

    #[test]
    fn test_filter_clause() {
        let (clause, params) = filter_clause(&PopulationFilter::default());
        assert_eq!(
            clause,
            "type = ?1 AND for_sale = ?2 AND enabled = 1 AND ml_municipality IS NOT NULL"
        );
        assert_eq!(params.len(), 2);

        let relaxed = PopulationFilter {
            category: PropertyCategory::House,
            for_sale: false,
            enabled_only: false,
            require_ml_location: false,
        };
        let (clause, params) = filter_clause(&relaxed);
        assert_eq!(clause, "type = ?1 AND for_sale = ?2");
        assert_eq!(params[0], Value::Text("house".into()));
        assert_eq!(params[1], Value::Integer(0));
    }

    #[tokio::test]
    async fn test_price_statistic() {
        let s = store();
        for (i, price) in [100_000.0, 140_000.0, 120_000.0].into_iter().enumerate() {
            s.insert_listing(&Listing::apartment(format!("a{i}"), "Vracar", price)).unwrap();
        }
        let stats = s.price_statistic(&PopulationFilter::default()).await.unwrap();
        assert_eq!(stats.mean, Some(120_000.0));
        assert!((stats.std_dev.unwrap() - 20_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_feature_statistic_ignores_nulls() {
        let s = store();
        s.insert_listing(&Listing::apartment("a1", "Vracar", 1.0).with_feature(Feature::Floor, 2.0))
            .unwrap();
        s.insert_listing(&Listing::apartment("a2", "Vracar", 1.0).with_feature(Feature::Floor, 4.0))
            .unwrap();
        s.insert_listing(&Listing::apartment("a3", "Vracar", 1.0)).unwrap();

        let stats = s
            .feature_statistic(Feature::Floor, &PopulationFilter::default())
            .await
            .unwrap();
        assert_eq!(stats.mean, Some(3.0));
        assert!((stats.std_dev.unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_small_populations() {
        let s = store();
        let empty = s.price_statistic(&PopulationFilter::default()).await.unwrap();
        assert_eq!(empty, PopulationStats::undefined());

        s.insert_listing(&Listing::apartment("a1", "Vracar", 75_000.0)).unwrap();
        let single = s.price_statistic(&PopulationFilter::default()).await.unwrap();
        assert_eq!(single.mean, Some(75_000.0));
        assert_eq!(single.std_dev, None);
    }

    #[tokio::test]
    async fn test_latest_coefficients() {
        let s = store();
        assert!(s.latest().await.unwrap().is_none());

        let weights = FeatureWeights::from_fn(|f| f.index() as f64 / 100.0);
        s.insert_coefficients(&RegressionCoefficients::new(1, day(1), 0.5, weights)).unwrap();
        s.insert_coefficients(&RegressionCoefficients::new(2, day(15), -0.25, weights)).unwrap();
        s.insert_coefficients(&RegressionCoefficients::new(3, day(15), 0.75, weights)).unwrap();
        s.insert_coefficients(&RegressionCoefficients::new(4, day(3), 0.0, weights)).unwrap();

        let latest = s.latest().await.unwrap().unwrap();
        assert_eq!(latest.version, 3);
        assert_eq!(latest.calculated_at, day(15));
        assert_eq!(latest.intercept, 0.75);
        assert_eq!(latest.weights, weights);
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let s = store();
        let c = RegressionCoefficients::new(1, day(1), 0.0, FeatureWeights::zeros());
        s.insert_coefficients(&c).unwrap();
        assert!(s.insert_coefficients(&c).is_err());
    }

    #[tokio::test]
    async fn test_corrupt_date_reported() {
        let s = store();
        s.insert_coefficients(&RegressionCoefficients::new(1, day(1), 0.0, FeatureWeights::zeros()))
            .unwrap();
        s.conn
            .lock()
            .execute("UPDATE linear_regression SET date_calculated = 'yesterday'", [])
            .unwrap();
        let err = s.latest().await.unwrap_err();
        assert!(matches!(err, ProviderError::Corrupt(_)), "{err}");
    }

    #[tokio::test]
    async fn test_coefficient_history_ordered_by_version() {
        let s = store();
        assert!(s.coefficient_history().await.unwrap().is_empty());
        s.insert_coefficients(&RegressionCoefficients::new(2, day(9), 0.2, FeatureWeights::zeros()))
            .unwrap();
        s.insert_coefficients(&RegressionCoefficients::new(1, day(2), 0.1, FeatureWeights::zeros()))
            .unwrap();
        let versions: Vec<u64> = s
            .coefficient_history()
            .await
            .unwrap()
            .iter()
            .map(|c| c.version)
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
