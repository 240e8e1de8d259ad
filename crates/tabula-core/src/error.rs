//! Error types for Tabula

use thiserror::Error;

/// Core error type for Tabula operations
#[derive(Error, Debug)]
pub enum TabulaError {
    /// An identifier was rejected before any statement ran
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution, commit or rollback failed
    #[error("Statement error: {0}")]
    Statement(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Coarse classification of a [`TabulaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Connection,
    Statement,
    Schema,
    Parse,
    Configuration,
    Io,
    NotSupported,
}

impl TabulaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabulaError::Validation(_) => ErrorKind::Validation,
            TabulaError::Connection(_) => ErrorKind::Connection,
            TabulaError::Statement(_) => ErrorKind::Statement,
            TabulaError::Schema(_) => ErrorKind::Schema,
            TabulaError::Parse { .. } => ErrorKind::Parse,
            TabulaError::Configuration(_) => ErrorKind::Configuration,
            TabulaError::Io(_) => ErrorKind::Io,
            TabulaError::NotSupported(_) => ErrorKind::NotSupported,
        }
    }

    /// Whether this error is allowed to reach the caller under the lenient policy
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
