//! Layered configuration for the price prediction service.
//!
//! Configuration is loaded in layers with increasing priority:
//! 1. Compiled-in defaults (local SQLite file, the apartment-for-sale slice)
//! 2. TOML configuration file (if provided)
//! 3. Environment variable overrides (prefix `ESTATE_`, nested with `__`)
//! 4. `DATABASE_PATH` for the inventory database location
//!
//! The population filter lives here rather than in the query layer so that
//! a deployment states explicitly which slice of the inventory its model
//! was fitted on.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::types::{PopulationFilter, PropertyCategory};

// ── Default value functions ────────────────────────────────────────────

/// Default bind host.
fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default HTTP port: 3000.
fn default_port() -> u16 {
    3000
}

/// Default per-fetch timeout: 5 000 ms.
fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

// ── Configuration structs ──────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Population slice statistics are computed over.
    pub population: PopulationConfig,
    /// Where statistics and coefficients are read from.
    pub store: StoreConfig,
    /// Prediction pipeline settings.
    #[serde(default)]
    pub prediction: PredictionConfig,
    /// Log output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Population slice configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationConfig {
    /// `house` or `apartment`.
    pub category: PropertyCategory,
    /// `true` for sale listings, `false` for rentals.
    #[serde(default = "default_true")]
    pub for_sale: bool,
    #[serde(default = "default_true")]
    pub enabled_only: bool,
    #[serde(default = "default_true")]
    pub require_ml_location: bool,
}

impl PopulationConfig {
    pub fn filter(&self) -> PopulationFilter {
        PopulationFilter {
            category: self.category,
            for_sale: self.for_sale,
            enabled_only: self.enabled_only,
            require_ml_location: self.require_ml_location,
        }
    }
}

/// Statistics/coefficient backend selector.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Inventory and coefficient tables in a SQLite database.
    Sqlite,
    /// Pre-computed statistics and coefficients in a JSON file.
    Snapshot,
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file (used by the `sqlite` backend).
    #[serde(default)]
    pub sqlite_path: String,
    /// JSON snapshot file (used by the `snapshot` backend).
    #[serde(default)]
    pub snapshot_path: String,
}

/// Prediction pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Upper bound on each statistics/coefficient fetch, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Structured JSON output instead of pretty-printed lines.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Load configuration using layered sources.
    ///
    /// 1. Compiled-in defaults.
    /// 2. TOML file at `config_path` (if `Some`).
    /// 3. Environment variable overrides with prefix `ESTATE_` and `__` as
    ///    the nesting separator (e.g., `ESTATE_POPULATION__CATEGORY=house`).
    /// 4. `DATABASE_PATH` overrides `store.sqlite_path`.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder()
            // ── Layer 1: compiled-in defaults ───────────────────────
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("population.category", "apartment")?
            .set_default("population.for_sale", true)?
            .set_default("population.enabled_only", true)?
            .set_default("population.require_ml_location", true)?
            .set_default("store.backend", "sqlite")?
            .set_default("store.sqlite_path", "estate.db")?
            .set_default("store.snapshot_path", "")?
            .set_default("prediction.fetch_timeout_ms", default_fetch_timeout_ms() as i64)?
            .set_default("logging.json", false)?;

        // ── Layer 2: TOML file ─────────────────────────────────────
        if let Some(path) = config_path {
            let path_str = path
                .to_str()
                .context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        // ── Layer 3: env var overrides (ESTATE_ prefix) ────────────
        // The prefix separator has to be `_` explicitly, otherwise the
        // `config` crate reuses the `__` nesting separator for it.
        builder = builder.add_source(
            Environment::with_prefix("ESTATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut cfg: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        // ── Layer 4: dedicated database env var ────────────────────
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            cfg.store.sqlite_path = v;
        }

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate configuration invariants.
    fn validate(&self) -> Result<()> {
        match self.store.backend {
            StoreBackend::Sqlite if self.store.sqlite_path.is_empty() => {
                bail!("store.sqlite_path is required for the sqlite backend")
            }
            StoreBackend::Snapshot if self.store.snapshot_path.is_empty() => {
                bail!("store.snapshot_path is required for the snapshot backend")
            }
            _ => {}
        }
        if self.prediction.fetch_timeout_ms == 0 {
            bail!("prediction.fetch_timeout_ms must be positive");
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that touch the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        std::env::remove_var("ESTATE_POPULATION__CATEGORY");
        std::env::remove_var("ESTATE_SERVER__PORT");
        std::env::remove_var("ESTATE_PREDICTION__FETCH_TIMEOUT_MS");
        std::env::remove_var("DATABASE_PATH");
    }

    /// `.toml` suffix so the `config` crate detects the format.
    fn write_temp_toml(content: &str) -> (tempfile::NamedTempFile, PathBuf) {
        let mut f = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        write!(f, "{}", content).expect("write temp file");
        let path = f.path().to_path_buf();
        (f, path)
    }

    #[test]
    fn test_load_defaults_only() {
        let _lock = lock_env();
        clear_env();

        let cfg = AppConfig::load(None).expect("load defaults");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.sqlite_path, "estate.db");
        assert_eq!(cfg.prediction.fetch_timeout_ms, 5000);
        assert!(!cfg.logging.json);
        assert_eq!(cfg.population.filter(), PopulationFilter::default());
    }

    #[test]
    fn test_load_from_toml() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
[server]
port = 8080

[population]
category = "house"
for_sale = false

[store]
backend = "snapshot"
snapshot_path = "/var/lib/estate/stats.json"

[prediction]
fetch_timeout_ms = 750

[logging]
json = true
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let cfg = AppConfig::load(Some(path)).expect("load from toml");

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.store.backend, StoreBackend::Snapshot);
        assert_eq!(cfg.store.snapshot_path, "/var/lib/estate/stats.json");
        assert_eq!(cfg.prediction.fetch_timeout_ms, 750);
        assert!(cfg.logging.json);

        let filter = cfg.population.filter();
        assert_eq!(filter.category, PropertyCategory::House);
        assert!(!filter.for_sale);
        assert!(filter.enabled_only);
        assert!(filter.require_ml_location);
    }

    #[test]
    fn test_env_var_overrides() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("ESTATE_POPULATION__CATEGORY", "house");
        std::env::set_var("ESTATE_SERVER__PORT", "9000");

        let cfg = AppConfig::load(None).expect("load with env override");
        assert_eq!(cfg.population.category, PropertyCategory::House);
        assert_eq!(cfg.server.port, 9000);

        clear_env();
    }

    #[test]
    fn test_database_path_env() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("DATABASE_PATH", "/data/inventory.db");

        let cfg = AppConfig::load(None).expect("load with database path");
        assert_eq!(cfg.store.sqlite_path, "/data/inventory.db");

        clear_env();
    }

    #[test]
    fn test_snapshot_backend_without_path_fails() {
        let _lock = lock_env();
        clear_env();

        let (_f, path) = write_temp_toml("[store]\nbackend = \"snapshot\"\n");
        let err = AppConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("snapshot_path"));
    }

    #[test]
    fn test_zero_timeout_fails() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("ESTATE_PREDICTION__FETCH_TIMEOUT_MS", "0");

        let result = AppConfig::load(None);
        assert!(result.is_err());

        clear_env();
    }
}
