//! Error types for the simulation engine

use thiserror::Error;

/// Simulation result type
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors that can occur while configuring a run or reducing its results
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Configuration rejected before setup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Aggregate statistic requested over zero completed customers
    #[error("Result set is empty: no customer completed service")]
    EmptyResultSet,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
