//! Data Models
//!
//! This module contains the core data structures used throughout Horizon:
//!
//! - `Node` - A vertex of a workspace graph (agent, portfolio, team, custom, output, block)
//! - `Workspace` - The Horizon that owns a node graph, with derived stats
//! - `Entity` - Related agents, portfolios and teams shown alongside the graph
//! - `Edge` - Presentation edges synthesized on read, never stored

mod edge;
mod entity;
mod node;
mod workspace;

pub use edge::{Edge, EdgeKind};
pub use entity::{CreateEntityParams, Entity, EntityKind, EntitySummary};
pub use node::{
    CreateNodeParams, DeleteResult, Node, NodeType, NodeUpdate, Position, ValidationError,
};
pub use workspace::{CreateWorkspaceParams, Workspace, WorkspaceStats};
