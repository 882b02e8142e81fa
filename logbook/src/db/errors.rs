use thiserror::Error;

/// Unified error type for document store operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Document not found by the given reference
    #[error("Document not found")]
    NotFound,

    /// The store could not be reached or refused the operation
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be decoded into the requested entity
    #[error("Malformed document {reference}: {message}")]
    Malformed { reference: String, message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            // Connectivity problems: the store is unreachable from this process
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Protocol(_) => DbError::Unavailable(err.to_string()),
            // The server rejected the statement
            sqlx::Error::Database(db_err) => DbError::Unavailable(db_err.message().to_string()),
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for store operation results
pub type Result<T> = std::result::Result<T, DbError>;
