//! GraphStore Trait - Persistence Abstraction
//!
//! This module defines the `GraphStore` trait that the services use to persist
//! workspaces, nodes and related entities. Graph logic never talks to the
//! database directly; it loads node documents through this trait, derives
//! structure in memory, and writes the results back in batches.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and remote backends fit
//!    behind the same interface
//! 2. **Ownership Semantics**: Write methods take ownership of documents
//! 3. **Error Handling**: Uses `anyhow::Result`; the service layer maps failures
//!    into `GraphError`
//! 4. **Batch Atomicity**: `save_nodes` and `deactivate_nodes` are all-or-nothing
//!    where the backend supports transactions
//!
//! # Examples
//!
//! ```rust,no_run
//! use horizon_core::db::{GraphStore, SurrealStore};
//! use horizon_core::models::{Node, NodeType, Position, Workspace};
//! use std::sync::Arc;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn GraphStore> = Arc::new(SurrealStore::new_in_memory().await?);
//!
//!     let workspace = store
//!         .create_workspace(Workspace::new("user-1".to_string(), "Research".to_string()))
//!         .await?;
//!
//!     let node = Node::new(
//!         workspace.id.clone(),
//!         "user-1".to_string(),
//!         NodeType::Agent,
//!         None,
//!         Position::default(),
//!         json!({}),
//!     );
//!     store.create_node(node).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::models::{Entity, Node, Workspace};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for graph persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single store can be shared by
/// every request handler through an `Arc`.
///
/// # Method Categories
///
/// - **Workspaces**: create, get, update, deactivate
/// - **Nodes**: create, get, list, child lookup, batch save, batch deactivate
/// - **Entities**: create, list visible to a workspace
#[async_trait]
pub trait GraphStore: Send + Sync {
    //
    // WORKSPACES
    //

    /// Insert a new workspace record
    async fn create_workspace(&self, workspace: Workspace) -> Result<Workspace>;

    /// Fetch a workspace by id, active or not
    async fn get_workspace(&self, id: &str) -> Result<Option<Workspace>>;

    /// Overwrite a workspace record (stats, name, editors)
    async fn update_workspace(&self, workspace: Workspace) -> Result<Workspace>;

    /// Mark a workspace and every node in it inactive in one batch
    ///
    /// Returns the number of nodes that were active before the call.
    async fn deactivate_workspace(&self, id: &str) -> Result<usize>;

    //
    // NODES
    //

    /// Insert a new node document
    ///
    /// Fails if a node with the same id already exists, in any workspace.
    async fn create_node(&self, node: Node) -> Result<Node>;

    /// Fetch a node by id, active or not
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;

    /// List the nodes of a workspace in creation order
    ///
    /// Inactive nodes are only included when `include_inactive` is set.
    async fn list_nodes(&self, workspace_id: &str, include_inactive: bool) -> Result<Vec<Node>>;

    /// Active nodes whose `parent_id` is one of `parent_ids`, in creation order
    async fn find_children(&self, workspace_id: &str, parent_ids: &[String]) -> Result<Vec<Node>>;

    /// Overwrite a batch of existing node documents atomically
    async fn save_nodes(&self, nodes: Vec<Node>) -> Result<()>;

    /// Mark a batch of nodes inactive atomically
    ///
    /// Ids are applied in the given order, so callers put the cascade target last.
    async fn deactivate_nodes(&self, ids: &[String]) -> Result<()>;

    //
    // ENTITIES
    //

    /// Insert a related entity record
    async fn create_entity(&self, entity: Entity) -> Result<Entity>;

    /// Active entities scoped to `workspace_id` plus every system entity
    async fn list_entities(&self, workspace_id: &str) -> Result<Vec<Entity>>;
}
