//! LOD: a static quadtree over a terrain height-grid, re-evaluated every frame.
//!
//! # Invariants
//! - Topology is fixed at construction; only visibility flags change afterwards.
//! - Node ids follow preorder (root, NW, SW, NE, SE subtrees).
//! - After a visibility pass every point of the terrain is covered by exactly
//!   one visible node.
//!
//! The renderer reads [`LodIndex::visible_nodes`] and stitches each node's
//! [`VertexWindow`] into a mesh patch.

mod index;
mod node;
mod visibility;

pub use index::{LodConfig, LodError, LodIndex, MAX_LOD_DEPTH, node_count_for_depth};
pub use node::{GridIndex, LodNode, VertexWindow};
pub use visibility::VisibilityStats;

pub fn crate_info() -> &'static str {
    "terraquad-lod v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("lod"));
    }
}
