//! Error types for ocean construction and simulation.

use thiserror::Error;

/// Result type for ocean operations
pub type Result<T> = std::result::Result<T, OceanError>;

/// Errors that can occur while building or driving an ocean simulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OceanError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("size mismatch: expected {expected}, got {actual}")]
    GridMismatch { expected: usize, actual: usize },

    #[error("resource conflict: {0}")]
    ResourceConflict(String),

    #[error("unknown resource handle #{0}")]
    UnknownResource(usize),

    #[error("dispatch '{0}' issued before the previous stage was fenced")]
    MissingBarrier(&'static str),

    #[error("GPU unavailable: {0}")]
    GpuUnavailable(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

impl OceanError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        OceanError::InvalidArgument(msg.into())
    }
}
