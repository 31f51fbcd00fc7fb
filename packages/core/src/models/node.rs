//! Node Data Structures
//!
//! This module defines the `Node` struct stored in the `nodes` collection and the
//! partial-update and creation types used by the service layer.
//!
//! # Architecture
//!
//! - **Flat documents**: Nodes reference each other by id (`parent_id`, `children`,
//!   `input_node_ids`, `child_node_ids`) instead of being embedded in a tree
//! - **Soft delete**: `is_active = false` hides a node from every graph computation
//!   while keeping it for history
//! - **Opaque payload**: `data` is keyed by `node_type` and never inspected by the
//!   graph engine
//!
//! # Examples
//!
//! ```rust
//! use horizon_core::models::{Node, NodeType, Position};
//! use serde_json::json;
//!
//! let agent = Node::new(
//!     "horizon-1".to_string(),
//!     "user-1".to_string(),
//!     NodeType::Agent,
//!     None,
//!     Position::new(120.0, 40.0),
//!     json!({ "model": "research" }),
//! );
//! assert!(agent.is_root());
//! assert!(agent.is_active);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for Node operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Invalid entity kind: {0}")]
    InvalidEntityKind(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Data validation failed: {0}")]
    InvalidData(String),
}

/// Kind of vertex in a workspace graph.
///
/// Determines which sub-shape of `Node::data` is meaningful. Only `Output`
/// nodes get special treatment from the graph engine (single-current-output
/// policy and reactivation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Agent,
    Portfolio,
    Team,
    Custom,
    Output,
    Block,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::Agent,
        NodeType::Portfolio,
        NodeType::Team,
        NodeType::Custom,
        NodeType::Output,
        NodeType::Block,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Agent => "agent",
            NodeType::Portfolio => "portfolio",
            NodeType::Team => "team",
            NodeType::Custom => "custom",
            NodeType::Output => "output",
            NodeType::Block => "block",
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, NodeType::Output)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("type".to_string()));
        }

        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::InvalidNodeType(trimmed.to_string()))
    }
}

/// 2D canvas coordinate. Presentation only, no effect on graph logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A vertex in a workspace (Horizon) graph.
///
/// # Fields
///
/// - `id`: Unique identifier (server UUID or client pre-generated id)
/// - `workspace_id`: Owning Horizon
/// - `owner_id`: User that created the node
/// - `node_type`: Tagged variant, serialized as `type`
/// - `parent_id`: Tree back-reference; `None` means root
/// - `children`: Cached mirror of the active nodes whose `parent_id` is this node
/// - `input_node_ids`: Data-flow inputs that are not tree parents
/// - `child_node_ids`: Nodes logically nested in a `block` node
/// - `is_active`: Soft-delete flag
///
/// `children` is never a second source of truth. It is recomputed from a
/// `parent_id` reverse scan by the integrity engine whenever the tree changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    pub workspace_id: String,

    pub owner_id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub input_node_ids: Vec<String>,

    #[serde(default)]
    pub child_node_ids: Vec<String>,

    #[serde(default)]
    pub position: Position,

    #[serde(default = "empty_object")]
    pub data: serde_json::Value,

    #[serde(default)]
    pub selected: bool,

    pub is_active: bool,

    /// Hint for deterministic execution sequencing, not enforced by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<i64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Node {
    /// Create a new active Node with an auto-generated UUID
    pub fn new(
        workspace_id: String,
        owner_id: String,
        node_type: NodeType,
        parent_id: Option<String>,
        position: Position,
        data: serde_json::Value,
    ) -> Self {
        Self::new_with_id(
            Uuid::new_v4().to_string(),
            workspace_id,
            owner_id,
            node_type,
            parent_id,
            position,
            data,
        )
    }

    /// Create a new active Node with a caller-supplied id
    ///
    /// Clients pre-generate ids for optimistic UI updates; the id is treated as
    /// an opaque key and uniqueness is enforced by the store.
    pub fn new_with_id(
        id: String,
        workspace_id: String,
        owner_id: String,
        node_type: NodeType,
        parent_id: Option<String>,
        position: Position,
        data: serde_json::Value,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            workspace_id,
            owner_id,
            node_type,
            parent_id,
            children: Vec::new(),
            input_node_ids: Vec::new(),
            child_node_ids: Vec::new(),
            position,
            data,
            selected: false,
            is_active: true,
            execution_order: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate node structure and self-references
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` or `workspace_id` is empty
    /// - `data` is not a JSON object
    /// - Node references itself as parent, input, or nested block child
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if self.workspace_id.trim().is_empty() {
            return Err(ValidationError::MissingField("workspaceId".to_string()));
        }

        if !self.data.is_object() {
            return Err(ValidationError::InvalidData(
                "data must be a JSON object".to_string(),
            ));
        }

        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(ValidationError::InvalidParent(
                "Node cannot be its own parent".to_string(),
            ));
        }

        if self.input_node_ids.iter().any(|id| id == &self.id) {
            return Err(ValidationError::InvalidReference(
                "Node cannot be its own input".to_string(),
            ));
        }

        if self.child_node_ids.iter().any(|id| id == &self.id) {
            return Err(ValidationError::InvalidReference(
                "Block cannot nest itself".to_string(),
            ));
        }

        if !self.child_node_ids.is_empty() && self.node_type != NodeType::Block {
            return Err(ValidationError::InvalidReference(format!(
                "Only block nodes can nest nodes, got '{}'",
                self.node_type
            )));
        }

        Ok(())
    }

    /// Check if this node is a tree root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Bump `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nulls
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update for PATCH operations
///
/// # Double-Option Pattern for Nullable Fields
///
/// - `None`: Don't change this field
/// - `Some(None)`: Set the field to NULL
/// - `Some(Some(value))`: Set the field to the specified value
///
/// # Examples
///
/// ```rust
/// # use horizon_core::models::NodeUpdate;
/// // Detach a node from its parent (it becomes a root)
/// let update = NodeUpdate {
///     parent_id: Some(None),
///     ..Default::default()
/// };
/// assert!(!update.is_empty());
/// assert!(update.changes_parent());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_node_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_node_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub execution_order: Option<Option<i64>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_inputs(mut self, input_node_ids: Vec<String>) -> Self {
        self.input_node_ids = Some(input_node_ids);
        self
    }

    /// Whether the update touches `parent_id` at all
    pub fn changes_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.parent_id.is_none()
            && self.position.is_none()
            && self.data.is_none()
            && self.input_node_ids.is_none()
            && self.child_node_ids.is_none()
            && self.selected.is_none()
            && self.execution_order.is_none()
    }
}

/// Parameters for `GraphService::create_node`
///
/// `id` is optional: when the client pre-generates ids for optimistic UI it
/// passes them here, otherwise a UUID is minted server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeParams {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub workspace_id: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(rename = "type", default)]
    pub node_type: String,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub input_node_ids: Vec<String>,

    #[serde(default)]
    pub child_node_ids: Vec<String>,

    #[serde(default)]
    pub execution_order: Option<i64>,
}

impl CreateNodeParams {
    pub fn new(workspace_id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_inputs(mut self, input_node_ids: Vec<String>) -> Self {
        self.input_node_ids = input_node_ids;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Check required fields and parse the node type
    pub fn validate(&self) -> Result<NodeType, ValidationError> {
        if self.workspace_id.trim().is_empty() {
            return Err(ValidationError::MissingField("workspaceId".to_string()));
        }

        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ValidationError::MissingField("id".to_string()));
            }
        }

        self.node_type.parse()
    }
}

/// Result of a cascading delete
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Number of descendants deactivated together with the target node
    pub deleted_count: usize,
}
