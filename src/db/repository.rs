//! Repository error types for the message service
//!
//! Database failures surface through a dedicated error type so the
//! processing pipeline can treat them as recoverable-application errors
//! rather than transport failures.

use thiserror::Error;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convert repository errors to application errors
impl From<RepositoryError> for crate::error::Error {
    fn from(err: RepositoryError) -> Self {
        crate::error::Error::database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err = RepositoryError::QueryExecution("boom".to_string());
        let app_err: crate::error::Error = err.into();
        assert!(matches!(app_err, crate::error::Error::Database(_)));
    }
}
