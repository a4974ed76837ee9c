/// Error types for Thumbnail Service
///
/// This module defines all error types that can occur in the thumbnail-service.
/// Errors are converted to appropriate HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::fmt;

/// Result type for thumbnail-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
///
/// The first eight variants are the terminal states of the resolve state
/// machine; the remainder are infrastructure faults that propagate as 500s.
#[derive(Debug)]
pub enum AppError {
    /// The opaque id could not be decoded
    InvalidId(String),

    /// The id decoded to an entity kind that cannot own thumbnails
    UnsupportedType(String),

    /// The requested output format is not allowed for this owner kind
    UnsupportedFormat(String),

    /// The size path segment did not parse as an integer
    InvalidSize(String),

    /// The owner entity does not exist
    OwnerNotFound(String),

    /// The owner entity has no source image set
    NoSourceImage(String),

    /// The source image file is missing from storage
    SourceMissing(String),

    /// The source bytes are not a decodable image
    InvalidSourceImage(String),

    /// Database operation failed
    DatabaseError(String),

    /// Media storage operation failed
    StorageError(String),

    /// Internal server error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidId(msg) => write!(f, "{}", msg),
            AppError::UnsupportedType(msg) => write!(f, "{}", msg),
            AppError::UnsupportedFormat(msg) => write!(f, "{}", msg),
            AppError::InvalidSize(msg) => write!(f, "{}", msg),
            AppError::OwnerNotFound(msg) => write!(f, "{}", msg),
            AppError::NoSourceImage(msg) => write!(f, "{}", msg),
            AppError::SourceMissing(msg) => write!(f, "{}", msg),
            AppError::InvalidSourceImage(msg) => write!(f, "{}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    /// Stable machine-readable code for the JSON error body.
    fn code(&self) -> &'static str {
        match self {
            AppError::InvalidId(_) => "INVALID_ID",
            AppError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            AppError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AppError::InvalidSize(_) => "INVALID_SIZE",
            AppError::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            AppError::NoSourceImage(_) => "NO_SOURCE_IMAGE",
            AppError::SourceMissing(_) => "SOURCE_MISSING",
            AppError::InvalidSourceImage(_) => "INVALID_SOURCE_IMAGE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// JSON error body returned to API clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    code: &'static str,
    status: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidId(_)
            | AppError::UnsupportedType(_)
            | AppError::UnsupportedFormat(_)
            | AppError::InvalidSize(_)
            | AppError::OwnerNotFound(_)
            | AppError::NoSourceImage(_)
            | AppError::SourceMissing(_) => StatusCode::NOT_FOUND,
            AppError::InvalidSourceImage(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::StorageError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = ErrorBody {
            error: match status {
                StatusCode::BAD_REQUEST => "Bad Request",
                StatusCode::NOT_FOUND => "Not Found",
                StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
                _ => "Error",
            },
            message: self.to_string(),
            code: self.code(),
            status: status.as_u16(),
        };

        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
