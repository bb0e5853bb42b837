use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Table '{table}' is missing required columns: {missing:?}")]
    Schema { table: String, missing: Vec<String> },

    #[error("{0}")]
    NotFound(String),

    #[error(
        "No cached snapshot for shock_pct={requested}. Available cached shocks: {available:?}. \
         Use live simulation for non-cached shocks."
    )]
    SnapshotNotFound { requested: f64, available: Vec<f64> },

    #[error("Backing tables unavailable, missing files: {missing:?}")]
    UpstreamUnavailable { missing: Vec<PathBuf> },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RiskError {
    /// Stable label for the error class, used in response envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            RiskError::InvalidParameter(_)            => "invalid_parameter",
            RiskError::Schema { .. }                  => "schema_error",
            RiskError::NotFound(_)
            | RiskError::SnapshotNotFound { .. }      => "not_found",
            RiskError::UpstreamUnavailable { .. }     => "upstream_unavailable",
            RiskError::Database(_) | RiskError::Io(_) => "storage",
            RiskError::Serialization(_)
            | RiskError::Other(_)                     => "internal",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == "not_found"
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
