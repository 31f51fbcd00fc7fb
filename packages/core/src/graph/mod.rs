//! Pure Graph Algorithms
//!
//! Everything in this module works on in-memory node slices and never touches
//! the store, so the services can load a workspace once and derive structure
//! from it:
//!
//! - [`build_edges`] - synthesize presentation edges from parent and input references
//! - [`compute_children`] - the `children` cache value for a parent
//! - [`plan_repair`] - the corrective writes that make a workspace referentially sound

mod children;
mod edges;
mod repair;

pub use children::{compute_children, creation_order, current_output};
pub use edges::build_edges;
pub use repair::{plan_repair, RepairPlan, RepairReport};
