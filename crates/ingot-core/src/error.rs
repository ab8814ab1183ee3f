//! Error types for pipeline construction and encoding.

use crate::types::BindingKind;
use thiserror::Error;

/// Result type for construction-time operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving programs and creating pipelines.
#[derive(Debug, Error)]
pub enum Error {
    /// The entry point (or one of its specialization constants) does not
    /// exist in the program.
    #[error("Cannot resolve entry point '{name}': {reason}")]
    ProgramResolution { name: String, reason: String },

    /// The driver or pipeline compiler rejected the pipeline.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// The shader library could not be loaded or compiled.
    #[error("Library error: {0}")]
    Library(String),

    /// Any other platform failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors raised while encoding a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A binding required by the pipeline has no assigned value.
    #[error("Missing {kind} value for '{name}' argument")]
    MissingArgument { kind: BindingKind, name: String },

    /// The platform refused the encoded state.
    #[error("Backend error: {0}")]
    Backend(String),
}
