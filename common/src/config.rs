use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_input_path")]
    pub input_path: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Queue capacity is `workers * queue_factor`.
    #[serde(default = "default_queue_factor")]
    pub queue_factor: usize,
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClusteringConfig {
    #[serde(default = "default_zoom_bias")]
    pub zoom_bias: u32,
    #[serde(default = "default_cell_size_px")]
    pub cell_size_px: u32,
    #[serde(default = "default_listing_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_database_path() -> String {
    "real_estate.sqlite3".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_input_path() -> String {
    "ads.csv".to_string()
}

fn default_workers() -> usize {
    8
}

fn default_batch_size() -> usize {
    1000
}

fn default_queue_factor() -> usize {
    2
}

fn default_progress_every() -> u64 {
    10_000
}

fn default_delimiter() -> char {
    ','
}

fn default_zoom_bias() -> u32 {
    2
}

fn default_cell_size_px() -> u32 {
    256
}

fn default_listing_limit() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            workers: default_workers(),
            batch_size: default_batch_size(),
            queue_factor: default_queue_factor(),
            progress_every: default_progress_every(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            zoom_bias: default_zoom_bias(),
            cell_size_px: default_cell_size_px(),
            default_limit: default_listing_limit(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl IngestConfig {
    /// Capacity of the bounded batch queue between the reader and the workers.
    pub fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(self.queue_factor).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidInput("ingest.workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidInput("ingest.batch_size must be at least 1".into()));
        }
        if self.queue_factor == 0 {
            return Err(Error::InvalidInput("ingest.queue_factor must be at least 1".into()));
        }
        if !self.delimiter.is_ascii() {
            return Err(Error::InvalidInput(format!(
                "ingest.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        Ok(())
    }
}

impl Settings {
    pub fn new(path: &str) -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        // Build the configuration
        let config = builder.build()?;

        let settings: Settings = config.try_deserialize()?;

        debug!(
            database = %settings.database.path,
            workers = settings.ingest.workers,
            batch_size = settings.ingest.batch_size,
            "Loaded settings"
        );

        Ok(settings)
    }
}
