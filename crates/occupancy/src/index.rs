use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use terraquad_common::{
    BoundingQuad, EntityId, EntityRef, GeometryError, NodeId, NodeKind, Occupant, Quadrant,
};

use crate::node::OccNode;

/// Deepest level an [`OccupancyIndex`] may subdivide to.
pub const MAX_OCCUPANCY_DEPTH: u32 = 16;

/// Errors from building or mutating an [`OccupancyIndex`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OccupancyError {
    #[error("invalid world bounds: {0}")]
    InvalidBounds(#[from] GeometryError),
    #[error("max depth must be in 1..={max}, got {depth}")]
    InvalidDepth { depth: u32, max: u32 },
    #[error("occupancy threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),
    #[error("position ({x}, {z}) is outside the world bounds")]
    OutOfBounds { x: f32, z: f32 },
    #[error("entity {0} is not in the index")]
    NotInserted(EntityId),
    #[error("entity {0} is already in the index")]
    DuplicateEntity(EntityId),
    #[error("query radius must be a non-negative number, got {0}")]
    InvalidRadius(f32),
    #[error("index invariant violated: {0}")]
    InvariantViolation(String),
}

impl OccupancyError {
    /// Whether this error can only come from construction.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidBounds(_) | Self::InvalidDepth { .. } | Self::InvalidThreshold(_)
        )
    }

    fn out_of_bounds(pos: Vec3) -> Self {
        Self::OutOfBounds { x: pos.x, z: pos.z }
    }
}

/// Construction parameters for an [`OccupancyIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Deepest level leaves may be split to; the root is level 1.
    pub max_depth: u32,
    /// Entities a leaf holds before the next insertion splits it.
    pub threshold: usize,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            threshold: 4,
        }
    }
}

/// Quadtree over the world plane holding mobile point entities.
///
/// Starts as a single leaf. Nodes live in an arena addressed by [`NodeId`] and
/// are never freed; splitting appends four children. The index keeps its own
/// `EntityId -> leaf` table so occupants moved by a split stay findable.
#[derive(Debug, Clone)]
pub struct OccupancyIndex {
    pub(crate) nodes: Vec<OccNode>,
    /// Leaf ids in ascending order, so queries skip internal nodes.
    pub(crate) leaves: BTreeSet<NodeId>,
    pub(crate) locations: BTreeMap<EntityId, NodeId>,
    max_depth: u32,
    threshold: usize,
    subdivisions: usize,
}

impl OccupancyIndex {
    /// Create an index with one empty root leaf covering `world_box`.
    pub fn build(
        world_box: BoundingQuad,
        max_depth: u32,
        threshold: usize,
    ) -> Result<Self, OccupancyError> {
        world_box.validate()?;
        if !(1..=MAX_OCCUPANCY_DEPTH).contains(&max_depth) {
            return Err(OccupancyError::InvalidDepth {
                depth: max_depth,
                max: MAX_OCCUPANCY_DEPTH,
            });
        }
        if threshold < 1 {
            return Err(OccupancyError::InvalidThreshold(threshold));
        }

        tracing::debug!(?world_box, max_depth, threshold, "occupancy index created");

        Ok(Self {
            nodes: vec![OccNode::leaf(NodeId::ROOT, None, 1, world_box)],
            leaves: BTreeSet::from([NodeId::ROOT]),
            locations: BTreeMap::new(),
            max_depth,
            threshold,
            subdivisions: 0,
        })
    }

    pub fn from_config(
        world_box: BoundingQuad,
        config: &OccupancyConfig,
    ) -> Result<Self, OccupancyError> {
        Self::build(world_box, config.max_depth, config.threshold)
    }

    /// A square world of side `extent * scale` centered on the origin, the way
    /// a scaled terrain is laid out.
    pub fn centered(
        extent: f32,
        scale: f32,
        max_depth: u32,
        threshold: usize,
    ) -> Result<Self, OccupancyError> {
        Self::build(BoundingQuad::centered(extent * scale), max_depth, threshold)
    }

    /// Which child of `node` claims `pos`.
    ///
    /// Fails with `OutOfBounds` for positions outside the world and with
    /// `InvariantViolation` if `node` has no children or none claims `pos`.
    pub fn locate_quadrant(&self, node: NodeId, pos: Vec3) -> Result<Quadrant, OccupancyError> {
        let world = self.bounds();
        if !world.contains(pos) {
            return Err(OccupancyError::out_of_bounds(pos));
        }
        let n = self.node_checked(node)?;
        let children = n.children.ok_or_else(|| {
            OccupancyError::InvariantViolation(format!("node {node} has no children"))
        })?;
        let child_bounds = children.map(|c| self.nodes[c.index()].bounds);
        locate_in(&child_bounds, pos, &world).ok_or_else(|| {
            OccupancyError::InvariantViolation(format!(
                "no child of node {node} claims ({}, {})",
                pos.x, pos.z
            ))
        })
    }

    /// Place `entity` in the tree, splitting full leaves on the way down.
    ///
    /// Returns the leaf it landed in and records that leaf in
    /// `entity.current_node`.
    pub fn insert(&mut self, entity: &mut EntityRef) -> Result<NodeId, OccupancyError> {
        let _span = tracing::debug_span!("occupancy_insert", id = %entity.id).entered();

        if self.locations.contains_key(&entity.id) {
            return Err(OccupancyError::DuplicateEntity(entity.id));
        }
        if !self.is_in_bounds(entity.position) {
            return Err(OccupancyError::out_of_bounds(entity.position));
        }

        let leaf = self.place(NodeId::ROOT, *entity)?;
        entity.current_node = Some(leaf);
        Ok(leaf)
    }

    /// Insert anything exposing the [`Occupant`] capability.
    pub fn insert_occupant<O: Occupant + ?Sized>(
        &mut self,
        occupant: &O,
    ) -> Result<NodeId, OccupancyError> {
        let mut entity = EntityRef::from_occupant(occupant);
        self.insert(&mut entity)
    }

    /// Descend from `start` to the leaf owning `entity.position` and attach it.
    pub(crate) fn place(
        &mut self,
        start: NodeId,
        entity: EntityRef,
    ) -> Result<NodeId, OccupancyError> {
        let mut id = start;
        loop {
            let node = self.node_checked(id)?;
            match node.kind {
                NodeKind::Internal => {
                    let quadrant = self.locate_quadrant(id, entity.position)?;
                    id = self.child_of(id, quadrant)?;
                }
                NodeKind::Leaf => {
                    if node.occupants.len() < self.threshold || node.depth >= self.max_depth {
                        self.attach(id, entity);
                        return Ok(id);
                    }
                    // Full: split, then retry from this (now internal) node.
                    self.subdivide(id)?;
                }
            }
        }
    }

    pub(crate) fn attach(&mut self, id: NodeId, mut entity: EntityRef) {
        entity.current_node = Some(id);
        self.locations.insert(entity.id, id);
        let node = &mut self.nodes[id.index()];
        node.occupants.push(entity);
        node.visible = true;
    }

    /// Turn leaf `id` into an internal node with four fresh leaf children and
    /// hand its occupants down to them.
    fn subdivide(&mut self, id: NodeId) -> Result<(), OccupancyError> {
        let world = self.bounds();
        let (bounds, depth) = {
            let node = &self.nodes[id.index()];
            (node.bounds, node.depth)
        };
        let quads = bounds.split();

        // Route every occupant before touching the tree so a failure leaves it intact.
        let targets = self.nodes[id.index()]
            .occupants
            .iter()
            .map(|e| {
                locate_in(&quads, e.position, &world).ok_or_else(|| {
                    OccupancyError::InvariantViolation(format!(
                        "occupant {} of node {id} fits no quadrant",
                        e.id
                    ))
                })
            })
            .collect::<Result<Vec<Quadrant>, _>>()?;

        let first = self.nodes.len() as u32;
        let children = [
            NodeId(first),
            NodeId(first + 1),
            NodeId(first + 2),
            NodeId(first + 3),
        ];
        for (child, quad) in children.iter().zip(quads) {
            self.nodes
                .push(OccNode::leaf(*child, Some(id), depth + 1, quad));
        }

        let node = &mut self.nodes[id.index()];
        node.kind = NodeKind::Internal;
        node.children = Some(children);
        node.visible = false;
        let occupants = std::mem::take(&mut node.occupants);

        self.leaves.remove(&id);
        self.leaves.extend(children);
        self.subdivisions += 1;

        tracing::debug!(
            node = %id,
            depth,
            moved = occupants.len(),
            "leaf subdivided"
        );

        for (entity, quadrant) in occupants.into_iter().zip(targets) {
            self.attach(children[quadrant.index()], entity);
        }
        Ok(())
    }

    fn child_of(&self, id: NodeId, quadrant: Quadrant) -> Result<NodeId, OccupancyError> {
        self.nodes[id.index()]
            .children
            .map(|c| c[quadrant.index()])
            .ok_or_else(|| OccupancyError::InvariantViolation(format!("node {id} has no children")))
    }

    fn node_checked(&self, id: NodeId) -> Result<&OccNode, OccupancyError> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| OccupancyError::InvariantViolation(format!("node {id} does not exist")))
    }

    /// The leaf currently holding `id`, as tracked by the index.
    pub fn current_node(&self, id: EntityId) -> Option<NodeId> {
        self.locations.get(&id).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.locations.contains_key(&id)
    }

    /// The stored snapshot of entity `id`.
    pub fn get(&self, id: EntityId) -> Option<&EntityRef> {
        let leaf = self.current_node(id)?;
        self.nodes[leaf.index()].occupants.iter().find(|e| e.id == id)
    }

    /// Number of entities placed.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn root(&self) -> &OccNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> Option<&OccNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[OccNode] {
        &self.nodes
    }

    /// Leaves in ascending id order.
    pub fn leaves(&self) -> impl Iterator<Item = &OccNode> {
        self.leaves.iter().map(|id| &self.nodes[id.index()])
    }

    /// Leaves holding at least one entity.
    pub fn occupied_leaves(&self) -> impl Iterator<Item = &OccNode> {
        self.leaves().filter(|n| n.visible)
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// How many leaves have been split so far.
    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    pub fn bounds(&self) -> BoundingQuad {
        self.nodes[NodeId::ROOT.index()].bounds
    }

    /// Whether `pos` lies on or inside the world box.
    pub fn is_in_bounds(&self, pos: Vec3) -> bool {
        self.bounds().contains(pos)
    }
}

/// Quadrant of `children` (NW, SW, NE, SE) claiming `pos`, using the
/// half-open convention relative to `world`.
fn locate_in(children: &[BoundingQuad; 4], pos: Vec3, world: &BoundingQuad) -> Option<Quadrant> {
    Quadrant::ALL
        .into_iter()
        .find(|q| children[q.index()].contains_half_open(pos, world))
}
