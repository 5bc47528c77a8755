use thiserror::Error;

pub mod config;
pub mod logging;
pub mod model;
pub mod storage;

pub use model::{GeoBounds, Listing, PricedPoint, PropertyType};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Required column '{0}' not found in input header")]
    MissingColumn(String),

    #[error("Invalid {field} value '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No load worker could connect to the store ({0} attempted)")]
    NoWorkers(usize),

    #[error("Batch queue closed before input was exhausted")]
    QueueClosed,
}
