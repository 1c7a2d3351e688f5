use crate::domain::Record;
use thiserror::Error;

/// The generation provider call failed. Network, authentication, content
/// rejection and rate limiting all collapse into this one error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("generation failed: {message}")]
pub struct GenerationError {
    message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store unreachable, worksheet missing or contents unreadable.
    #[error("failed to read table: {0}")]
    Read(String),
    /// Permission, quota or network failure while overwriting the table.
    #[error("failed to write table: {0}")]
    Write(String),
}

/// Terminal failure of one submission cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The output was generated but could not be persisted; it only exists
    /// in `record` now.
    #[error("generated but not saved: {source}")]
    NotSaved {
        record: Record,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    /// The record that was generated, if generation got that far.
    pub fn unsaved_record(&self) -> Option<&Record> {
        match self {
            Self::Generation(_) => None,
            Self::NotSaved { record, .. } => Some(record),
        }
    }
}
