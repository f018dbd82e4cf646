use serde::{Deserialize, Serialize};
use terraquad_common::{BoundingQuad, GeometryError, NodeId, NodeKind, Quadrant};

use crate::node::{GridIndex, LodNode, VertexWindow};
use crate::visibility::VisibilityStats;

/// Deepest tree a [`LodIndex`] will build (about 350k nodes).
pub const MAX_LOD_DEPTH: u32 = 10;

/// Errors raised while building a [`LodIndex`]. All of them are fatal for
/// construction; no partially built index is ever returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    #[error("invalid terrain bounds: {0}")]
    InvalidBounds(#[from] GeometryError),
    #[error("max depth must be in 1..={max}, got {depth}")]
    InvalidDepth { depth: u32, max: u32 },
    #[error("grid {width}x{depth} is too coarse for {max_depth} levels")]
    GridTooCoarse {
        width: u32,
        depth: u32,
        max_depth: u32,
    },
}

/// Construction parameters handed over by the terrain loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Number of tree levels; the root is level 1.
    pub max_depth: u32,
    /// Height-grid samples along x.
    pub grid_width: u32,
    /// Height-grid samples along z.
    pub grid_depth: u32,
    /// Initial view radius. Half the terrain size when unset.
    pub view_radius: Option<f32>,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            grid_width: 512,
            grid_depth: 512,
            view_radius: None,
        }
    }
}

/// Number of nodes in a complete quadtree of `max_depth` levels.
pub fn node_count_for_depth(max_depth: u32) -> usize {
    (0..max_depth).map(|i| 4usize.pow(i)).sum()
}

/// Static chunked-LOD quadtree over a terrain.
///
/// Every node is allocated up front in preorder and addressed by [`NodeId`].
/// Call [`LodIndex::update_visibility`] (or [`LodIndex::refresh`]) once per
/// frame, then hand [`LodIndex::visible_nodes`] to the renderer.
#[derive(Debug, Clone)]
pub struct LodIndex {
    pub(crate) nodes: Vec<LodNode>,
    max_depth: u32,
    grid_width: u32,
    grid_depth: u32,
    pub(crate) view_radius: f32,
    pub(crate) stats: VisibilityStats,
}

impl LodIndex {
    /// Build the full tree over `root_box`.
    pub fn build(
        root_box: BoundingQuad,
        grid_width: u32,
        grid_depth: u32,
        max_depth: u32,
    ) -> Result<Self, LodError> {
        let _span = tracing::info_span!("lod_build", max_depth, grid_width, grid_depth).entered();

        root_box.validate()?;
        if !(1..=MAX_LOD_DEPTH).contains(&max_depth) {
            return Err(LodError::InvalidDepth {
                depth: max_depth,
                max: MAX_LOD_DEPTH,
            });
        }
        // The deepest window steps by grid / 2^max_depth; it must not collapse.
        if grid_width >> max_depth == 0 || grid_depth >> max_depth == 0 {
            return Err(LodError::GridTooCoarse {
                width: grid_width,
                depth: grid_depth,
                max_depth,
            });
        }

        let mut builder = TreeBuilder {
            nodes: Vec::with_capacity(node_count_for_depth(max_depth)),
            next_id: 0,
            grid_width,
            grid_depth,
            max_depth,
        };
        builder.build_node(root_box, None, 1, GridIndex::default());

        let mut nodes = builder.nodes;
        for node in &mut nodes {
            node.vertex_window.to_zero_based();
        }

        tracing::debug!(
            nodes = nodes.len(),
            leaf_size = root_box.height() / 2f32.powi(max_depth as i32 - 1),
            "lod tree built"
        );

        Ok(Self {
            nodes,
            max_depth,
            grid_width,
            grid_depth,
            view_radius: root_box.width().max(root_box.height()) / 2.0,
            stats: VisibilityStats::default(),
        })
    }

    /// Build from a loaded [`LodConfig`].
    pub fn from_config(root_box: BoundingQuad, config: &LodConfig) -> Result<Self, LodError> {
        let mut index = Self::build(
            root_box,
            config.grid_width,
            config.grid_depth,
            config.max_depth,
        )?;
        if let Some(radius) = config.view_radius {
            index.view_radius = radius.max(0.0);
        }
        Ok(index)
    }

    pub fn root(&self) -> &LodNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> Option<&LodNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in preorder.
    pub fn nodes(&self) -> &[LodNode] {
        &self.nodes
    }

    pub fn leaves(&self) -> impl Iterator<Item = &LodNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Height-grid dimensions as `(width, depth)`.
    pub fn grid_dims(&self) -> (u32, u32) {
        (self.grid_width, self.grid_depth)
    }

    pub fn bounds(&self) -> BoundingQuad {
        self.root().bounds
    }
}

/// Preorder construction state. `next_id` is the only id source.
struct TreeBuilder {
    nodes: Vec<LodNode>,
    next_id: u32,
    grid_width: u32,
    grid_depth: u32,
    max_depth: u32,
}

impl TreeBuilder {
    fn build_node(
        &mut self,
        bounds: BoundingQuad,
        parent: Option<NodeId>,
        depth: u32,
        origin: GridIndex,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        debug_assert_eq!(id.index(), self.nodes.len());

        let step_x = self.grid_width >> depth;
        let step_z = self.grid_depth >> depth;
        let kind = if depth == self.max_depth {
            NodeKind::Leaf
        } else {
            NodeKind::Internal
        };

        self.nodes.push(LodNode {
            id,
            parent,
            depth,
            kind,
            bounds,
            visible: false,
            children: None,
            vertex_window: VertexWindow::from_origin(origin, step_x, step_z),
        });

        if kind == NodeKind::Leaf {
            return id;
        }

        let quads = bounds.split();
        let mut children = [NodeId::ROOT; 4];
        for quadrant in Quadrant::ALL {
            let child_origin = GridIndex::new(
                origin.x + if quadrant.is_east() { step_x } else { 0 },
                origin.z + if quadrant.is_south() { step_z } else { 0 },
            );
            children[quadrant.index()] = self.build_node(
                quads[quadrant.index()],
                Some(id),
                depth + 1,
                child_origin,
            );
        }
        self.nodes[id.index()].children = Some(children);
        id
    }
}
