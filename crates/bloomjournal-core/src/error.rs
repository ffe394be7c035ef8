//! Core error types for bloomjournal-core.
//!
//! This module defines the error hierarchy using thiserror. Engine
//! functions themselves are total; errors come from the store seam,
//! configuration, and the per-user transaction loop in the service.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for bloomjournal-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Plant lifecycle errors
    #[error("Plant error: {0}")]
    Plant(#[from] PlantError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by the plant transactions.
#[derive(Error, Debug)]
pub enum PlantError {
    /// No plant has been created for this user yet
    #[error("No plant found for user '{user_id}'")]
    NotFound { user_id: String },

    /// Onboarding was requested twice
    #[error("A plant already exists for user '{user_id}'")]
    AlreadyExists { user_id: String },

    /// Every compare-and-swap attempt lost against a concurrent writer
    #[error("Concurrent update conflict for user '{user_id}' after {attempts} attempts")]
    Conflict { user_id: String, attempts: u32 },
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Stored plant document could not be decoded
    #[error("Corrupt plant record for user '{user_id}': {message}")]
    CorruptRecord { user_id: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
