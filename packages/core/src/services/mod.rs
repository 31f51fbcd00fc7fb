//! Business Services
//!
//! This module contains the business logic layer:
//!
//! - `GraphService` - Entry point: validation, access checks, stats, events
//! - `IntegrityEngine` - Descendants, cascades, orphan repair, children caches
//! - `WorkspaceAggregator` - Assembles the repaired read view of a workspace
//! - `MutationSync` - Reconciles client node lists with persisted state
//!
//! Services coordinate between the store and the pure graph algorithms.

mod access;
mod error;
mod graph_service;
mod integrity;
mod mutation_sync;
mod workspace_view;

pub use access::{AccessPolicy, OwnerOrEditor};
pub use error::GraphError;
pub use graph_service::GraphService;
pub use integrity::{CascadeOutcome, IntegrityEngine};
pub use mutation_sync::{ClientNode, MissingNodePolicy, MutationSync, SyncReport};
pub use workspace_view::{WorkspaceAggregator, WorkspaceView};
