//! Error types for the design and post-processing pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for pipeline operations.
///
/// Every variant is local to one FASTA record: the driver logs it and moves on
/// to the next record.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A design-engine output key did not follow `PRIMER_<ROLE>_<INDEX>_<ATTRIBUTE>`.
    #[error("Unexpected design output key '{key}': {reason}")]
    Schema {
        /// The offending key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// The design engine could not be run or reported an error.
    #[error("Design engine failed for '{sequence_id}': {reason}")]
    DesignEngine {
        /// Record being designed
        sequence_id: String,
        /// Engine message or launch failure
        reason: String,
    },

    /// Invalid setting or parameter value.
    #[error("Invalid setting '{parameter}': {reason}")]
    Config {
        /// The setting name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Output table could not be assembled or written.
    #[error("Table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn schema(key: &str, reason: impl Into<String>) -> Self {
        PipelineError::Schema { key: key.to_string(), reason: reason.into() }
    }

    pub(crate) fn config(parameter: &str, reason: impl Into<String>) -> Self {
        PipelineError::Config { parameter: parameter.to_string(), reason: reason.into() }
    }
}
