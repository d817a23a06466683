//! Error types for extraction
//!
//! Every error carries enough identity (resource, field, path) to act on it
//! without re-running with extra logging.

use chartgen_core::CoreError;
use thiserror::Error;

/// Extraction error
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid document: {0}")]
    InvalidDocument(#[source] CoreError),

    #[error(
        "External file path conflict at '{path}': {resource} field '{field}' \
         (sha256 {new_checksum}) collides with {existing_resource} field '{existing_field}' \
         (sha256 {existing_checksum})"
    )]
    PathConflict {
        path: String,
        resource: String,
        field: String,
        new_checksum: String,
        existing_resource: String,
        existing_field: String,
        existing_checksum: String,
    },

    #[error("Strategy '{strategy}' failed on {resource} field '{field}': {message}")]
    Strategy {
        strategy: String,
        resource: String,
        field: String,
        message: String,
    },

    #[error("{output} '{path}' of {resource} is already used by {existing_resource}")]
    OutputCollision {
        output: &'static str,
        path: String,
        resource: String,
        existing_resource: String,
    },

    #[error("Failed to process {resource}: {source}")]
    Resource {
        resource: String,
        #[source]
        source: Box<ExtractError>,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExtractError {
    /// Build a strategy failure for a specific field
    pub fn strategy(
        strategy: &str,
        resource: impl ToString,
        field: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Strategy {
            strategy: strategy.to_string(),
            resource: resource.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Attach the identity of the resource being processed
    pub fn in_resource(self, resource: impl ToString) -> Self {
        match self {
            // Already qualified
            Self::Strategy { .. }
            | Self::PathConflict { .. }
            | Self::OutputCollision { .. }
            | Self::Resource { .. } => self,
            other => Self::Resource {
                resource: resource.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn is_path_conflict(&self) -> bool {
        match self {
            Self::PathConflict { .. } => true,
            Self::Resource { source, .. } => source.is_path_conflict(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
