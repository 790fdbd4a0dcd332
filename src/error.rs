//! Error types for the call tree profiler
//!
//! Nesting violations, tree-construction bugs and output failures all end up
//! here. Application edges (config files, the CLI) wrap these in `anyhow`.

use thiserror::Error;

/// Errors that can occur while measuring, building or rendering call trees
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// `end` was called for a different timer than the one on top of the stack
    #[error("Expected timer '{expected}', but had timer '{actual}' on the stack")]
    StackMismatch { expected: String, actual: String },

    /// An aggregation bucket disappeared while building the tree
    #[error("Statistics must not be absent for path {path}")]
    MissingStatistics { path: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, ProfilerError>;
