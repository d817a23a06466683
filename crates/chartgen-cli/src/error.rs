//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of categories, each with its
//! own exit code and, where one helps, a hint.

use chartgen_core::CoreError;
use chartgen_extract::ExtractError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// A manifest could not be read or decoded
    #[error("Input error: {message}")]
    #[diagnostic(code(chartgen::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Generator configuration is invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartgen::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A strategy failed or two values claimed the same external path
    #[error("Extraction failed: {message}")]
    #[diagnostic(code(chartgen::cli::extract))]
    Extraction {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Strict mode and some resources were not handled
    #[error("{count} resource(s) not handled by any strategy")]
    #[diagnostic(
        code(chartgen::cli::unhandled),
        help("run without --strict to skip them, or register a strategy for their type")
    )]
    Unhandled { count: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartgen::cli::io))]
    Io { message: String },

    /// Internal error (unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartgen::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Extraction { .. } => exit_codes::EXTRACTION_ERROR,
            CliError::Unhandled { .. } => exit_codes::UNHANDLED_RESOURCES,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Map a manifest loading error
    pub fn manifest(path: &std::path::Path, err: CoreError) -> Self {
        match err {
            CoreError::Io(io) => Self::Io {
                message: format!("{}: {}", path.display(), io),
            },
            other => Self::Input {
                message: format!("{}: {}", path.display(), other),
                help: Some("manifests must be YAML documents separated by '---'".to_string()),
            },
        }
    }
}

impl From<ExtractError> for CliError {
    fn from(err: ExtractError) -> Self {
        if is_invalid_document(&err) {
            return CliError::Input {
                message: err.to_string(),
                help: Some("every document needs apiVersion, kind and metadata.name".to_string()),
            };
        }

        let help = if err.is_path_conflict() {
            Some(
                "two different values map to the same external file; rename one of the keys"
                    .to_string(),
            )
        } else if matches!(err, ExtractError::OutputCollision { .. }) {
            Some("two resources would render to the same chart output; rename one of them".to_string())
        } else {
            None
        };
        CliError::Extraction {
            message: err.to_string(),
            help,
        }
    }
}

fn is_invalid_document(err: &ExtractError) -> bool {
    match err {
        ExtractError::InvalidDocument(_) => true,
        ExtractError::Resource { source, .. } => is_invalid_document(source),
        _ => false,
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
