use serde::{Deserialize, Serialize};
use terraquad_common::{BoundingQuad, EntityKind, EntityRef, NodeId, NodeKind};

/// One quadrant of the occupancy tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccNode {
    pub id: NodeId,
    /// `None` for the root.
    pub parent: Option<NodeId>,
    /// Root is depth 1.
    pub depth: u32,
    pub kind: NodeKind,
    pub bounds: BoundingQuad,
    /// True while this leaf holds at least one entity.
    pub visible: bool,
    /// Children in NW, SW, NE, SE order, created by the first split.
    pub children: Option<[NodeId; 4]>,
    pub(crate) occupants: Vec<EntityRef>,
}

impl OccNode {
    pub(crate) fn leaf(id: NodeId, parent: Option<NodeId>, depth: u32, bounds: BoundingQuad) -> Self {
        Self {
            id,
            parent,
            depth,
            kind: NodeKind::Leaf,
            bounds,
            visible: false,
            children: None,
            occupants: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Entities held by this leaf, in placement order. Always empty for
    /// internal nodes.
    pub fn occupants(&self) -> &[EntityRef] {
        &self.occupants
    }

    pub fn agents(&self) -> impl Iterator<Item = &EntityRef> {
        self.of_kind(EntityKind::Agent)
    }

    pub fn emitters(&self) -> impl Iterator<Item = &EntityRef> {
        self.of_kind(EntityKind::Emitter)
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntityRef> {
        self.occupants.iter().filter(move |e| e.kind == kind)
    }

    pub fn occupancy(&self) -> usize {
        self.occupants.len()
    }
}
