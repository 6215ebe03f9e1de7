use std::path::PathBuf;
use thiserror::Error;

use super::config::ConfigError;
use super::predictor::PredictorError;
use crate::core::io::pdb::PdbError;
use crate::core::models::job::{JobIdError, StateError};
use crate::core::models::sequence::SequenceError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid sequence: {source}")]
    InvalidSequence {
        #[from]
        source: SequenceError,
    },

    #[error("Invalid job id: {source}")]
    InvalidJobId {
        #[from]
        source: JobIdError,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Inference failed: {source}")]
    Inference {
        #[from]
        source: PredictorError,
    },

    #[error("Failed to write structure '{path}': {source}")]
    Structure {
        path: PathBuf,
        #[source]
        source: PdbError,
    },

    #[error("Job store I/O error at '{path}': {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed job document '{path}': {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job state error: {source}")]
    State {
        #[from]
        source: StateError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True for errors caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSequence { .. } | Self::InvalidJobId { .. }
        )
    }
}
