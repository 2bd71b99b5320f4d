//! Error types for catalog ingestion and orbit geometry

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Local catalog file missing or unreadable
    #[error("Catalog source unavailable at {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required column is absent from a loaded file
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// One partition of a multi-partition fetch failed
    #[error("Query for partition '{partition}' failed: {reason}")]
    PartitionQueryFailed { partition: String, reason: String },

    /// One row's individual lookup failed
    #[error("Lookup for '{key}' failed: {reason}")]
    RowEnrichmentFailed { key: String, reason: String },

    /// A lookup returned no rows
    #[error("No object found for key '{0}'")]
    EmptyLookup(String),

    /// Degenerate or open orbit passed to the trajectory generator
    #[error("Invalid orbit: {0}")]
    InvalidOrbit(String),

    /// Semi-major axis or eccentricity missing
    #[error("Incomplete orbital elements: {0}")]
    IncompleteElements(String),

    #[error("Trajectory needs at least 2 samples, got {0}")]
    InvalidSampleCount(usize),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CatalogError {
    pub fn partition_failed(partition: impl Into<String>, reason: impl ToString) -> Self {
        Self::PartitionQueryFailed {
            partition: partition.into(),
            reason: reason.to_string(),
        }
    }

    pub fn row_failed(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::RowEnrichmentFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that only affect a single trajectory request.
    pub fn is_orbit_rejection(&self) -> bool {
        matches!(
            self,
            CatalogError::InvalidOrbit(_)
                | CatalogError::IncompleteElements(_)
                | CatalogError::InvalidSampleCount(_)
        )
    }
}
