//! Error types for rust_ruvseq

use thiserror::Error;

/// Main error type for normalization and concordance operations
#[derive(Error, Debug)]
pub enum RuvError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("Insufficient negative controls: {reason}")]
    InsufficientControls { reason: String },

    #[error("Insufficient replicates: {reason}")]
    InsufficientReplicates { reason: String },

    #[error("Numerical instability in {operation}: {details}")]
    NumericalInstability { operation: String, details: String },

    #[error("Analysis of dataset '{dataset}' (k = {k}) failed: {source}")]
    Dataset {
        dataset: String,
        k: usize,
        #[source]
        source: Box<RuvError>,
    },

    #[error("Comparison '{comparison}' failed: {source}")]
    Comparison {
        comparison: String,
        #[source]
        source: Box<RuvError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuvError {
    /// Strip dataset/comparison context and return the underlying error
    pub fn root(&self) -> &RuvError {
        match self {
            RuvError::Dataset { source, .. } | RuvError::Comparison { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for rust_ruvseq operations
pub type Result<T> = std::result::Result<T, RuvError>;
