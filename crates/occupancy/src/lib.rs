//! Occupancy: a quadtree that grows on demand as entities are placed in it.
//!
//! # Invariants
//! - Every placed entity lives in exactly one leaf, and the index knows which.
//! - A leaf only splits once it already holds `threshold` entities and sits
//!   above `max_depth`; splits are one-way.
//! - Every point of the world box maps to exactly one child of any internal
//!   node (top/left edges inclusive, bottom/right only on the world boundary).
//! - A failed call leaves the index unchanged.

mod index;
mod node;
mod query;
mod relocate;

pub use index::{MAX_OCCUPANCY_DEPTH, OccupancyConfig, OccupancyError, OccupancyIndex};
pub use node::OccNode;
pub use query::shuffle;

pub fn crate_info() -> &'static str {
    "terraquad-occupancy v0.1.0"
}
