//! Developer tooling: read-only inspection and text reports over the indices.
//!
//! # Invariants
//! - Inspection never mutates an index.
//! - Reports list nodes in ascending id order so output is stable across runs.

pub mod inspector;

pub use inspector::{
    IndexInspector, LeafOccupants, LodSummary, NodeVisibility, OccupancySummary,
};

pub fn crate_info() -> &'static str {
    "terraquad-tools v0.1.0"
}
