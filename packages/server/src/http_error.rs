//! HTTP error handling
//!
//! Every failed request answers with the same JSON body, `{message, code, details?}`,
//! and a status derived from the error code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use horizon_core::GraphError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" | "RESOURCE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "CIRCULAR_REFERENCE" | "INVALID_OPERATION" => {
                StatusCode::BAD_REQUEST
            }
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<GraphError> for HttpError {
    fn from(err: GraphError) -> Self {
        let message = err.to_string();

        match err {
            GraphError::NotFound { entity: "Node", .. } => {
                HttpError::new(message, "NODE_NOT_FOUND")
            }
            GraphError::NotFound { .. } => HttpError::new(message, "RESOURCE_NOT_FOUND"),
            GraphError::Validation(_) => HttpError::new(message, "VALIDATION_ERROR"),
            GraphError::Forbidden(_) => HttpError::new(message, "FORBIDDEN"),
            GraphError::Conflict(_) => HttpError::new(message, "CONFLICT"),
            GraphError::CircularReference { .. } => HttpError::new(message, "CIRCULAR_REFERENCE"),
            GraphError::InvalidOperation(_) => HttpError::new(message, "INVALID_OPERATION"),
            GraphError::Database(ref source) => {
                tracing::error!("Database error: {:?}", source);
                HttpError::with_details("Database unavailable", "DATABASE_ERROR", message)
            }
            GraphError::QueryFailed(_) => {
                tracing::error!("{}", message);
                HttpError::with_details("Query failed", "DATABASE_ERROR", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GraphError::node_not_found("n1"), StatusCode::NOT_FOUND),
            (GraphError::workspace_not_found("w1"), StatusCode::NOT_FOUND),
            (GraphError::forbidden("nope"), StatusCode::FORBIDDEN),
            (GraphError::conflict("dup"), StatusCode::CONFLICT),
            (
                GraphError::circular_reference("a -> a"),
                StatusCode::BAD_REQUEST,
            ),
            (
                GraphError::invalid_operation("not an output"),
                StatusCode::BAD_REQUEST,
            ),
            (
                GraphError::query_failed("disk full"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(HttpError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_body_omits_empty_details() {
        let body = serde_json::to_value(HttpError::from(GraphError::node_not_found("n1"))).unwrap();
        assert_eq!(body["code"], "NODE_NOT_FOUND");
        assert_eq!(body["message"], "Node not found: n1");
        assert!(body.get("details").is_none());
    }
}
