//! Horizon Core Graph Engine
//!
//! This crate provides the node-graph consistency engine behind the Horizon
//! pipeline builder: the data model, the persistence layer and the services
//! that keep a workspace graph referentially sound under partial,
//! client-driven updates.
//!
//! # Architecture
//!
//! - **Flat node documents**: Nodes reference parents, inputs and nested nodes by id
//! - **Derived structure**: `children` caches, edges and stats are recomputed from
//!   `parent_id` links, never trusted as a second source of truth
//! - **Repair on read**: Every workspace view self-heals dangling references first
//! - **Soft delete**: Deletion deactivates a node and its subtree
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, Workspace, Entity, Edge)
//! - [`graph`] - Pure algorithms (edge synthesis, children caches, repair planning)
//! - [`db`] - GraphStore trait and the SurrealDB implementation
//! - [`services`] - GraphService, IntegrityEngine, WorkspaceAggregator, MutationSync
//! - [`config`] - Service configuration

pub mod config;
pub mod db;
pub mod graph;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::GraphConfig;
pub use db::{DomainEvent, GraphStore, SurrealStore};
pub use models::*;
pub use services::*;
