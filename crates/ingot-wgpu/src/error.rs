//! Error types for the wgpu platform.

use thiserror::Error;

/// Errors raised by context creation, resource allocation and execution.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// GPU initialization failed.
    #[error("GPU initialization failed: {0}")]
    InitError(String),

    /// A shader library could not be composed or validated.
    #[error("Library error: {0}")]
    LibraryError(String),

    /// Buffer or texture allocation failed.
    #[error("Allocation failed: {0}")]
    AllocationError(String),

    /// Submission, polling or readback failed.
    #[error("Execution failed: {0}")]
    ExecutionError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline construction or encoding error from the binder.
    #[error(transparent)]
    Core(#[from] ingot_core::Error),

    #[error(transparent)]
    Encode(#[from] ingot_core::EncodeError),
}

/// Specialized Result type for platform operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
