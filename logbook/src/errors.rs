use crate::{auth::AuthRejected, db::errors::DbError, db::models::EntityError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Body of every 401. Rejection reasons only go to the logs.
pub const INVALID_SESSION: &str = "Invalid user session";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Token missing, invalid, or not matching the presented uid
    #[error("Not authenticated: {0}")]
    Unauthenticated(#[from] AuthRejected),

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body could not be turned into a record
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Requested resource not found
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Document store operation error
    #[error(transparent)]
    Database(#[from] DbError),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } | Error::Entity(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Database(DbError::NotFound) => StatusCode::NOT_FOUND,
            Error::Database(_) | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated(_) => INVALID_SESSION.to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::Entity(e) => e.to_string(),
            Error::NotFound { resource, id } => format!("{resource} {id} not found"),
            Error::Database(DbError::NotFound) => "Resource not found".to_string(),
            Error::Database(_) | Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(DbError::NotFound) => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Database(_) | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthenticated(AuthRejected::KeysUnavailable(_)) => {
                tracing::warn!("Authentication error: {}", self);
            }
            Error::Unauthenticated(_) => {
                tracing::debug!("Authentication error: {}", self);
            }
            Error::BadRequest { .. } | Error::Entity(_) | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Body that is not a JSON object, or not JSON at all
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
