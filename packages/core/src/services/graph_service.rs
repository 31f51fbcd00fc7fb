//! Graph Service
//!
//! The entry point used by transport layers. It validates requests, checks
//! workspace access for the acting user, delegates structural work to the
//! [`IntegrityEngine`], [`WorkspaceAggregator`] and [`MutationSync`], keeps
//! workspace stats current and publishes [`DomainEvent`]s.
//!
//! # Examples
//!
//! ```rust,no_run
//! use horizon_core::db::SurrealStore;
//! use horizon_core::models::{CreateNodeParams, CreateWorkspaceParams};
//! use horizon_core::services::GraphService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SurrealStore::new_in_memory().await?);
//!     let service = GraphService::new(store).with_actor("user-1");
//!
//!     let workspace = service
//!         .create_workspace(CreateWorkspaceParams {
//!             name: "Research".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let agent = service
//!         .create_node(CreateNodeParams::new(&workspace.id, "agent"))
//!         .await?;
//!
//!     let view = service.get_workspace_view(&workspace.id).await?;
//!     assert_eq!(view.nodes[0].id, agent.id);
//!     Ok(())
//! }
//! ```

use crate::config::GraphConfig;
use crate::db::{DomainEvent, GraphStore};
use crate::models::{
    CreateEntityParams, CreateNodeParams, CreateWorkspaceParams, DeleteResult, Entity, Node,
    NodeUpdate, ValidationError, Workspace,
};
use crate::services::access::{AccessPolicy, OwnerOrEditor};
use crate::services::error::GraphError;
use crate::services::integrity::IntegrityEngine;
use crate::services::mutation_sync::{ClientNode, MutationSync, SyncReport};
use crate::services::workspace_view::{WorkspaceAggregator, WorkspaceView};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Owner recorded on records created without an acting user
const SYSTEM_ACTOR: &str = "system";

#[derive(Clone)]
pub struct GraphService {
    store: Arc<dyn GraphStore>,

    integrity: IntegrityEngine,

    aggregator: WorkspaceAggregator,

    sync: MutationSync,

    access: Arc<dyn AccessPolicy>,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<DomainEvent>,

    /// Serializes structural writes issued through this service (and its clones)
    write_lock: Arc<Mutex<()>>,

    /// Acting user; `None` means the system, which bypasses access checks
    actor: Option<String>,
}

impl GraphService {
    /// Create a service with the default configuration
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::build(store, GraphConfig::default())
    }

    /// Create a service with an explicit configuration
    pub fn with_config(
        store: Arc<dyn GraphStore>,
        config: GraphConfig,
    ) -> Result<Self, GraphError> {
        config.validate().map_err(GraphError::invalid_operation)?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<dyn GraphStore>, config: GraphConfig) -> Self {
        let integrity = IntegrityEngine::new(store.clone());
        let aggregator = WorkspaceAggregator::new(store.clone(), integrity.clone());
        let sync = MutationSync::new(store.clone(), integrity.clone(), config.missing_node_policy);
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);

        Self {
            store,
            integrity,
            aggregator,
            sync,
            access: Arc::new(OwnerOrEditor),
            event_tx,
            write_lock: Arc::new(Mutex::new(())),
            actor: None,
        }
    }

    /// Return a clone of this service acting on behalf of `actor`
    ///
    /// Access checks apply to the returned service and every event it emits
    /// carries `actor` as its source.
    pub fn with_actor(&self, actor: impl Into<String>) -> Self {
        let mut cloned = self.clone();
        cloned.actor = Some(actor.into());
        cloned
    }

    /// Replace the access policy (defaults to [`OwnerOrEditor`])
    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Subscribe to domain events published after successful writes
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    fn owner_id(&self) -> String {
        self.actor.clone().unwrap_or_else(|| SYSTEM_ACTOR.to_string())
    }

    //
    // ACCESS
    //

    async fn load_workspace(&self, id: &str) -> Result<Workspace, GraphError> {
        self.store
            .get_workspace(id)
            .await?
            .filter(|ws| ws.is_active)
            .ok_or_else(|| GraphError::workspace_not_found(id))
    }

    fn ensure_can_view(&self, workspace: &Workspace) -> Result<(), GraphError> {
        match self.actor.as_deref() {
            Some(actor) if !self.access.can_view(actor, workspace) => Err(GraphError::forbidden(
                format!("User {} cannot view workspace {}", actor, workspace.id),
            )),
            _ => Ok(()),
        }
    }

    fn ensure_can_edit(&self, workspace: &Workspace) -> Result<(), GraphError> {
        match self.actor.as_deref() {
            Some(actor) if !self.access.can_edit(actor, workspace) => Err(GraphError::forbidden(
                format!("User {} cannot edit workspace {}", actor, workspace.id),
            )),
            _ => Ok(()),
        }
    }

    async fn editable_workspace(&self, id: &str) -> Result<Workspace, GraphError> {
        let workspace = self.load_workspace(id).await?;
        self.ensure_can_edit(&workspace)?;
        Ok(workspace)
    }

    async fn active_node(&self, id: &str) -> Result<Node, GraphError> {
        self.store
            .get_node(id)
            .await?
            .filter(|n| n.is_active)
            .ok_or_else(|| GraphError::node_not_found(id))
    }

    /// A parent must be an active node of the same workspace
    async fn ensure_parent(&self, workspace_id: &str, parent_id: &str) -> Result<(), GraphError> {
        match self.store.get_node(parent_id).await? {
            Some(parent) if parent.is_active && parent.workspace_id == workspace_id => Ok(()),
            _ => Err(GraphError::parent_not_found(parent_id)),
        }
    }

    //
    // WORKSPACES
    //

    pub async fn create_workspace(
        &self,
        params: CreateWorkspaceParams,
    ) -> Result<Workspace, GraphError> {
        let name = params.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }

        let mut workspace = Workspace::new(self.owner_id(), name.to_string());
        workspace.description = params.description;
        workspace.editors = params.editors;

        let workspace = self.store.create_workspace(workspace).await?;
        tracing::info!("Created workspace {} for {}", workspace.id, workspace.owner_id);
        Ok(workspace)
    }

    pub async fn get_workspace(&self, id: &str) -> Result<Workspace, GraphError> {
        let workspace = self.load_workspace(id).await?;
        self.ensure_can_view(&workspace)?;
        Ok(workspace)
    }

    /// Soft-delete a workspace and every node in it
    pub async fn delete_workspace(&self, id: &str) -> Result<DeleteResult, GraphError> {
        self.editable_workspace(id).await?;

        let _guard = self.write_lock.lock().await;
        let deleted_count = self.store.deactivate_workspace(id).await?;

        tracing::info!("Deleted workspace {} with {} nodes", id, deleted_count);
        self.emit_event(DomainEvent::WorkspaceDeleted {
            workspace_id: id.to_string(),
            source_actor: self.actor.clone(),
        });

        Ok(DeleteResult { deleted_count })
    }

    /// Repaired nodes, edges, related entities and stats of a workspace
    pub async fn get_workspace_view(&self, id: &str) -> Result<WorkspaceView, GraphError> {
        let workspace = self.get_workspace(id).await?;

        let view = {
            let _guard = self.write_lock.lock().await;
            self.aggregator.load_view(workspace).await?
        };

        if !view.repair.is_clean() {
            self.emit_event(DomainEvent::OrphansRepaired {
                workspace_id: id.to_string(),
                report: view.repair.clone(),
                source_actor: self.actor.clone(),
            });
        }

        Ok(view)
    }

    /// Reconcile a client-submitted node list with the stored workspace
    pub async fn sync_workspace_nodes(
        &self,
        workspace_id: &str,
        nodes: Vec<ClientNode>,
    ) -> Result<SyncReport, GraphError> {
        let workspace = self.editable_workspace(workspace_id).await?;

        let report = {
            let _guard = self.write_lock.lock().await;
            self.sync.sync(&workspace, &self.owner_id(), nodes).await?
        };

        self.emit_event(DomainEvent::WorkspaceSynced {
            workspace_id: workspace_id.to_string(),
            created: report.created.clone(),
            updated: report.updated.clone(),
            deactivated: report.deactivated.clone(),
            source_actor: self.actor.clone(),
        });

        Ok(report)
    }

    /// Attach an agent, portfolio or team record to a workspace
    pub async fn create_entity(
        &self,
        workspace_id: &str,
        params: CreateEntityParams,
    ) -> Result<Entity, GraphError> {
        let kind = params.validate()?;
        self.editable_workspace(workspace_id).await?;

        let data = params
            .data
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        let entity = Entity::new(
            kind,
            Some(workspace_id.to_string()),
            params.name.trim().to_string(),
            data,
        );

        Ok(self.store.create_entity(entity).await?)
    }

    //
    // NODES
    //

    /// Create a node, optionally under a parent
    ///
    /// # Errors
    ///
    /// - `Validation` if the workspace id or type is missing or invalid
    /// - `NotFound` if the workspace or declared parent does not exist or is inactive
    /// - `Forbidden` if the actor cannot edit the workspace
    /// - `Conflict` if a caller-supplied id is already taken
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, GraphError> {
        let node_type = params.validate()?;
        let workspace = self.editable_workspace(&params.workspace_id).await?;

        if let Some(parent_id) = params.parent_id.as_deref() {
            self.ensure_parent(&workspace.id, parent_id).await?;
        }

        let data = params
            .data
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        let mut node = match params.id {
            Some(id) => Node::new_with_id(
                id,
                workspace.id.clone(),
                self.owner_id(),
                node_type,
                params.parent_id,
                params.position,
                data,
            ),
            None => Node::new(
                workspace.id.clone(),
                self.owner_id(),
                node_type,
                params.parent_id,
                params.position,
                data,
            ),
        };
        node.input_node_ids = params.input_node_ids;
        node.child_node_ids = params.child_node_ids;
        node.execution_order = params.execution_order;
        node.validate()?;

        let _guard = self.write_lock.lock().await;

        if self.store.get_node(&node.id).await?.is_some() {
            return Err(GraphError::conflict(format!(
                "Node id '{}' already exists",
                node.id
            )));
        }
        let node = self.store.create_node(node).await?;

        if let Some(parent_id) = node.parent_id.as_deref() {
            if node.node_type.is_output() {
                let superseded = self
                    .integrity
                    .supersede_outputs(&workspace.id, parent_id, &node.id)
                    .await?;
                if !superseded.is_empty() {
                    self.emit_event(DomainEvent::NodesDeactivated {
                        workspace_id: workspace.id.clone(),
                        node_ids: superseded,
                        source_actor: self.actor.clone(),
                    });
                }
            }
            self.integrity
                .refresh_children(&workspace.id, parent_id)
                .await?;
        }
        self.integrity.recompute_stats(&workspace.id).await?;

        tracing::debug!("Created {} node {}", node.node_type, node.id);
        self.emit_event(DomainEvent::NodeCreated {
            node: node.clone(),
            source_actor: self.actor.clone(),
        });

        Ok(node)
    }

    /// Fetch a node, including soft-deleted ones
    pub async fn get_node(&self, id: &str) -> Result<Node, GraphError> {
        let node = self
            .store
            .get_node(id)
            .await?
            .ok_or_else(|| GraphError::node_not_found(id))?;

        let workspace = self.load_workspace(&node.workspace_id).await?;
        self.ensure_can_view(&workspace)?;

        Ok(node)
    }

    /// Apply a partial update
    ///
    /// Re-parenting refreshes the `children` cache of both the old and the
    /// new parent. Making a node its own parent, or moving it under one of
    /// its descendants, is rejected with `CircularReference`.
    pub async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node, GraphError> {
        let current = self.active_node(id).await?;
        let workspace = self.editable_workspace(&current.workspace_id).await?;

        if update.is_empty() {
            return Ok(current);
        }

        let new_parent = match &update.parent_id {
            Some(parent) if *parent != current.parent_id => Some(parent.clone()),
            _ => None,
        };

        if let Some(Some(parent_id)) = &new_parent {
            if parent_id == id {
                return Err(GraphError::circular_reference(format!(
                    "Node {} cannot be its own parent",
                    id
                )));
            }

            self.ensure_parent(&workspace.id, parent_id).await?;
        }

        let mut node = current.clone();
        if let Some(node_type) = &update.node_type {
            node.node_type = node_type.parse()?;
        }
        if let Some(parent) = new_parent.clone() {
            node.parent_id = parent;
        }
        if let Some(position) = update.position {
            node.position = position;
        }
        if let Some(data) = update.data {
            node.data = data;
        }
        if let Some(inputs) = update.input_node_ids {
            node.input_node_ids = inputs;
        }
        if let Some(nested) = update.child_node_ids {
            node.child_node_ids = nested;
        }
        if let Some(selected) = update.selected {
            node.selected = selected;
        }
        if let Some(order) = update.execution_order {
            node.execution_order = order;
        }
        node.validate()?;
        node.touch();

        let _guard = self.write_lock.lock().await;

        if let Some(Some(parent_id)) = &new_parent {
            let descendants = self.integrity.find_descendants(id, &workspace.id).await?;
            if descendants.contains(parent_id) {
                return Err(GraphError::circular_reference(format!(
                    "Cannot move node {} under its descendant {}",
                    id, parent_id
                )));
            }
        }

        self.store.save_nodes(vec![node.clone()]).await?;

        let type_changed = node.node_type != current.node_type;

        // An output that lands under a parent, by type change or move,
        // becomes that parent's current output
        let mut superseded = Vec::new();
        if let (true, Some(parent_id)) = (node.node_type.is_output(), node.parent_id.as_deref()) {
            if type_changed || new_parent.is_some() {
                superseded = self
                    .integrity
                    .supersede_outputs(&workspace.id, parent_id, &node.id)
                    .await?;
            }
        }

        if new_parent.is_some() || type_changed {
            let mut parents: Vec<&str> = Vec::new();
            parents.extend(current.parent_id.as_deref());
            parents.extend(node.parent_id.as_deref());
            parents.dedup();
            for parent_id in parents {
                self.integrity
                    .refresh_children(&workspace.id, parent_id)
                    .await?;
            }
        }
        if new_parent.is_some() || !superseded.is_empty() {
            self.integrity.recompute_stats(&workspace.id).await?;
        }

        if !superseded.is_empty() {
            self.emit_event(DomainEvent::NodesDeactivated {
                workspace_id: workspace.id.clone(),
                node_ids: superseded,
                source_actor: self.actor.clone(),
            });
        }
        self.emit_event(DomainEvent::NodeUpdated {
            node: node.clone(),
            source_actor: self.actor.clone(),
        });

        Ok(node)
    }

    /// Cascade soft-delete a node and its subtree
    ///
    /// Deleting an inactive node re-cascades to any descendant still active;
    /// an id that never existed is `NotFound`.
    pub async fn delete_node(&self, id: &str) -> Result<DeleteResult, GraphError> {
        let node = self
            .store
            .get_node(id)
            .await?
            .ok_or_else(|| GraphError::node_not_found(id))?;
        let workspace = self.editable_workspace(&node.workspace_id).await?;

        let outcome = {
            let _guard = self.write_lock.lock().await;
            let outcome = self.integrity.cascade_delete(&node).await?;
            self.integrity.recompute_stats(&workspace.id).await?;
            outcome
        };

        self.emit_event(DomainEvent::NodesDeactivated {
            workspace_id: workspace.id.clone(),
            node_ids: outcome.deactivated(&node.id),
            source_actor: self.actor.clone(),
        });
        if !outcome.repair.is_clean() {
            self.emit_event(DomainEvent::OrphansRepaired {
                workspace_id: workspace.id,
                report: outcome.repair.clone(),
                source_actor: self.actor.clone(),
            });
        }

        Ok(DeleteResult {
            deleted_count: outcome.descendants.len(),
        })
    }

    /// Set a superseded or deleted `output` node active again
    pub async fn reactivate_output(&self, id: &str) -> Result<Node, GraphError> {
        let node = self
            .store
            .get_node(id)
            .await?
            .ok_or_else(|| GraphError::node_not_found(id))?;
        let workspace = self.editable_workspace(&node.workspace_id).await?;

        let node = {
            let _guard = self.write_lock.lock().await;
            let node = self.integrity.reactivate(id).await?;
            self.integrity.recompute_stats(&workspace.id).await?;
            node
        };

        self.emit_event(DomainEvent::NodeReactivated {
            node: node.clone(),
            source_actor: self.actor.clone(),
        });

        Ok(node)
    }

    /// Ids of all active descendants of a node, breadth-first
    pub async fn find_descendants(&self, id: &str) -> Result<Vec<String>, GraphError> {
        let node = self.get_node(id).await?;
        self.integrity
            .find_descendants(&node.id, &node.workspace_id)
            .await
    }
}
