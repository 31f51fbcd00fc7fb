//! Database Error Types
//!
//! This module defines error types for store construction: connecting to the
//! embedded engine and initializing the schema. Query failures during normal
//! operation are reported through `anyhow` with context by the store methods.

use thiserror::Error;

/// Database setup errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open the embedded engine
    #[error("Failed to connect to database at {target}: {source}")]
    ConnectionFailed {
        target: String,
        source: surrealdb::Error,
    },

    /// Failed to select namespace/database or define tables and indexes
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Failed to create the directory holding an on-disk database
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),
}

impl DatabaseError {
    pub fn connection_failed(target: impl Into<String>, source: surrealdb::Error) -> Self {
        Self::ConnectionFailed {
            target: target.into(),
            source,
        }
    }

    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }
}
