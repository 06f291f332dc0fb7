//! Custom error types for the common library
//!
//! This module defines the error types shared by every service: database
//! access failures and settings loading failures.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Error raised while loading process settings
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration sources could not be read or deserialized
    #[error("Settings error: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was read but is not acceptable
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
