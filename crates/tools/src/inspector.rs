use serde::Serialize;
use terraquad_common::{EntityId, NodeId, NodeKind};
use terraquad_lod::LodIndex;
use terraquad_occupancy::OccupancyIndex;

/// Index inspector for developer tooling.
///
/// Provides read-only summaries and reports against both indices for
/// debugging and the CLI.
pub struct IndexInspector;

impl IndexInspector {
    /// Produce a summary of the LOD index and its last visibility pass.
    pub fn lod_summary(index: &LodIndex) -> LodSummary {
        LodSummary {
            node_count: index.len(),
            leaf_count: index.leaves().count(),
            max_depth: index.max_depth(),
            visible_count: index.visible_nodes().count(),
            view_radius: index.view_radius(),
        }
    }

    /// Produce a summary of the occupancy index.
    pub fn occupancy_summary(index: &OccupancyIndex) -> OccupancySummary {
        let mut summary = OccupancySummary {
            node_count: index.nodes().len(),
            entity_count: index.len(),
            ..OccupancySummary::default()
        };
        for leaf in index.leaves() {
            summary.leaf_count += 1;
            summary.deepest_depth = summary.deepest_depth.max(leaf.depth);
            if leaf.occupancy() > 0 {
                summary.occupied_leaves += 1;
            }
            summary.agents += leaf.agents().count();
            summary.emitters += leaf.emitters().count();
        }
        summary
    }

    /// One line per internal node: `[id]-- [child] ...`, with `*` marking
    /// children that were split in turn.
    pub fn tree_report(index: &OccupancyIndex) -> String {
        let mut out = String::new();
        for node in index.nodes() {
            let Some(children) = node.children else {
                continue;
            };
            let labels = children
                .iter()
                .map(|child| {
                    let split = index
                        .node(*child)
                        .is_some_and(|c| c.kind == NodeKind::Internal);
                    format!("[{child}{}]", if split { "*" } else { "" })
                })
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("[{}]-- {labels}\n", node.id));
        }
        out
    }

    /// Entity ids held by each occupied leaf, split by kind.
    pub fn occupant_report(index: &OccupancyIndex) -> Vec<LeafOccupants> {
        index
            .occupied_leaves()
            .map(|leaf| LeafOccupants {
                leaf: leaf.id,
                depth: leaf.depth,
                agents: leaf.agents().map(|e| e.id).collect(),
                emitters: leaf.emitters().map(|e| e.id).collect(),
            })
            .collect()
    }

    /// Visibility of every internal node next to that of its children.
    pub fn visibility_report(index: &LodIndex) -> Vec<NodeVisibility> {
        index
            .nodes()
            .iter()
            .filter_map(|node| {
                let children = node.children?;
                let child_visible =
                    children.map(|c| index.node(c).is_some_and(|n| n.visible));
                Some(NodeVisibility {
                    node: node.id,
                    depth: node.depth,
                    visible: node.visible,
                    children,
                    child_visible,
                })
            })
            .collect()
    }
}

/// Summary of a LOD index for the inspector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LodSummary {
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: u32,
    pub visible_count: usize,
    pub view_radius: f32,
}

impl std::fmt::Display for LodSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LOD: nodes={} leaves={} max_depth={} visible={} view_radius={:.1}",
            self.node_count, self.leaf_count, self.max_depth, self.visible_count, self.view_radius
        )
    }
}

/// Summary of an occupancy index for the inspector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub node_count: usize,
    pub leaf_count: usize,
    pub occupied_leaves: usize,
    pub entity_count: usize,
    pub agents: usize,
    pub emitters: usize,
    pub deepest_depth: u32,
}

impl std::fmt::Display for OccupancySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Occupancy: nodes={} leaves={} occupied={} entities={} (agents={} emitters={}) deepest={}",
            self.node_count,
            self.leaf_count,
            self.occupied_leaves,
            self.entity_count,
            self.agents,
            self.emitters,
            self.deepest_depth
        )
    }
}

/// Occupants of one leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafOccupants {
    pub leaf: NodeId,
    pub depth: u32,
    pub agents: Vec<EntityId>,
    pub emitters: Vec<EntityId>,
}

impl std::fmt::Display for LeafOccupants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short = |ids: &[EntityId]| {
            ids.iter()
                .map(EntityId::short)
                .collect::<Vec<_>>()
                .join(" ")
        };
        write!(
            f,
            "Leaf [{}] depth={} agents: {} | emitters: {}",
            self.leaf,
            self.depth,
            short(&self.agents),
            short(&self.emitters)
        )
    }
}

/// Visibility of an internal LOD node and its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeVisibility {
    pub node: NodeId,
    pub depth: u32,
    pub visible: bool,
    pub children: [NodeId; 4],
    pub child_visible: [bool; 4],
}

impl std::fmt::Display for NodeVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |v: bool| if v { "+" } else { "-" };
        write!(f, "Node [{}]{} ->", self.node, mark(self.visible))?;
        for (child, visible) in self.children.iter().zip(self.child_visible) {
            write!(f, " [{child}]{}", mark(visible))?;
        }
        Ok(())
    }
}
