//! Service Layer Error Types
//!
//! This module defines error types for graph service operations. Store
//! failures arrive as `anyhow::Error` and are folded into `QueryFailed`.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Graph service errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Referenced workspace, node, or parent does not exist or is inactive
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Missing or malformed input; nothing was written
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Caller lacks the required rights on the workspace
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Id collision with an existing record or within a submission
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Re-parenting would create a cycle
    #[error("Circular reference detected: {context}")]
    CircularReference { context: String },

    /// Operation not applicable to the target
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Store construction failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Store query or write failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl GraphError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Node",
            id: id.into(),
        }
    }

    pub fn workspace_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Workspace",
            id: id.into(),
        }
    }

    pub fn parent_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Parent node",
            id: id.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn circular_reference(context: impl Into<String>) -> Self {
        Self::CircularReference {
            context: context.into(),
        }
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<anyhow::Error> for GraphError {
    fn from(err: anyhow::Error) -> Self {
        Self::QueryFailed(format!("{:#}", err))
    }
}
