use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
    #[error("No path from {from} to {to}")]
    Unreachable { from: String, to: String },
    #[error("Day {day}, hour {hour} is outside the configured time range")]
    InvalidTimeRange { day: u32, hour: u32 },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SimError::Unreachable { .. })
    }
}
