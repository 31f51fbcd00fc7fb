//! Database Layer
//!
//! Persistence for workspaces, nodes and related entities:
//!
//! - `GraphStore` trait that the services program against
//! - `SurrealStore`, the embedded SurrealDB implementation (on-disk or in-memory)
//! - `DomainEvent`s published after successful writes
//!
//! Nodes are flat documents that reference each other by id. The store never
//! interprets those references; all structural reasoning lives in
//! [`crate::graph`] and [`crate::services`].

mod error;
pub mod events;
mod graph_store;
mod surreal_store;

pub use error::DatabaseError;
pub use events::DomainEvent;
pub use graph_store::GraphStore;
pub use surreal_store::SurrealStore;
