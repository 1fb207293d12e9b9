//! Common error types for fotoflow

use thiserror::Error;

/// Common result type for fotoflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across fotoflow services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image could not be decoded (distinct from "no marker found")
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote object-store operation failed
    #[error("Remote storage error: {0}")]
    Remote(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
