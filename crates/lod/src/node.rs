use serde::{Deserialize, Serialize};
use terraquad_common::{BoundingQuad, NodeId, NodeKind};

/// A sample position in the external height-grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridIndex {
    pub x: u32,
    pub z: u32,
}

impl GridIndex {
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    fn offset(self, dx: u32, dz: u32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }
}

/// The 3x3 height-grid samples a node's mesh patch is built from.
///
/// `indices[x][z]` walks the node from its top-left corner in steps of the
/// node's half-size, so the middle row and column meet the neighbouring
/// patches of the next depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexWindow {
    pub indices: [[GridIndex; 3]; 3],
}

impl VertexWindow {
    /// Window anchored at `origin` with the given per-axis step.
    pub(crate) fn from_origin(origin: GridIndex, step_x: u32, step_z: u32) -> Self {
        let mut indices = [[GridIndex::default(); 3]; 3];
        for (x, column) in indices.iter_mut().enumerate() {
            for (z, cell) in column.iter_mut().enumerate() {
                *cell = origin.offset(step_x * x as u32, step_z * z as u32);
            }
        }
        Self { indices }
    }

    /// Shift every positive index down by one, turning the 1-based working
    /// range `0..=n` into valid 0-based grid indices `0..n`.
    pub(crate) fn to_zero_based(&mut self) {
        for cell in self.indices.iter_mut().flatten() {
            cell.x = cell.x.saturating_sub(1);
            cell.z = cell.z.saturating_sub(1);
        }
    }

    pub fn get(&self, x: usize, z: usize) -> GridIndex {
        self.indices[x][z]
    }

    pub fn top_left(&self) -> GridIndex {
        self.indices[0][0]
    }

    pub fn center(&self) -> GridIndex {
        self.indices[1][1]
    }

    pub fn bottom_right(&self) -> GridIndex {
        self.indices[2][2]
    }

    pub fn iter(&self) -> impl Iterator<Item = GridIndex> + '_ {
        self.indices.iter().flatten().copied()
    }
}

/// One quadrant of the terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodNode {
    pub id: NodeId,
    /// `None` for the root.
    pub parent: Option<NodeId>,
    /// Root is depth 1.
    pub depth: u32,
    pub kind: NodeKind,
    pub bounds: BoundingQuad,
    /// Set by the last visibility pass: render this node as one patch.
    pub visible: bool,
    /// Children in NW, SW, NE, SE order; `None` for leaves.
    pub children: Option<[NodeId; 4]>,
    pub vertex_window: VertexWindow,
}

impl LodNode {
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }
}
