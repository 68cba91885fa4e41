use axum::http::StatusCode;
use thiserror::Error;

use crate::http_error::AppError;

#[derive(Debug, Error)]
pub enum StoryError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// Absent, or owned by somebody else. The two are never distinguished.
    #[error("{0}")]
    NotFound(String),
    /// Search without a term. Kept at 404 for existing clients.
    #[error("Query is required!")]
    QueryRequired,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("file store error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoryError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoryError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StoryError::Validation(_) => StatusCode::BAD_REQUEST,
            StoryError::NotFound(_) | StoryError::QueryRequired => StatusCode::NOT_FOUND,
            StoryError::Database(_) | StoryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoryError> for AppError {
    fn from(e: StoryError) -> Self {
        AppError::new(e.status(), e.to_string())
    }
}
