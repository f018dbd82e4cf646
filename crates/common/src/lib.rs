//! Shared types for the terraquad indices: the axis-aligned quad geometry both
//! trees partition, and the narrow entity view the occupancy index stores.
//!
//! # Invariants
//! - Partitioning happens on the XZ plane; the Y component is carried but ignored.
//! - A quad split always tiles its parent exactly (NW, SW, NE, SE).

pub mod geometry;
pub mod rng;
pub mod types;

pub use geometry::{BoundingQuad, GeometryError, Quadrant};
pub use rng::{SplitMix, splitmix64};
pub use types::{EntityId, EntityKind, EntityRef, KindFilter, NodeId, NodeKind, Occupant};

pub fn crate_info() -> &'static str {
    "terraquad-common v0.1.0"
}
