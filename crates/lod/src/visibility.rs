use std::time::{Duration, Instant};

use glam::Vec3;
use terraquad_common::NodeId;

use crate::index::LodIndex;
use crate::node::LodNode;

/// Per-pass statistics for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisibilityStats {
    /// Nodes marked for rendering.
    pub visible_nodes: usize,
    /// Of those, how many are full-resolution leaves.
    pub visible_leaves: usize,
    /// Nodes the pass descended into.
    pub nodes_visited: usize,
    pub frame_time: Duration,
}

impl LodIndex {
    /// Recompute which nodes the renderer should draw for a viewer at
    /// `viewer_pos` (y ignored).
    ///
    /// A child whose nearest corner lies within `view_radius` is refined
    /// further; any other child is drawn as one coarse patch. Leaves reached by
    /// refinement are always drawn. A radius of zero or less draws the root's
    /// children.
    pub fn update_visibility(&mut self, viewer_pos: Vec3, view_radius: f32) -> VisibilityStats {
        let _span = tracing::info_span!("lod_visibility").entered();
        let frame_start = Instant::now();

        for node in &mut self.nodes {
            node.visible = false;
        }

        let mut visited = 0;
        self.refine(NodeId::ROOT, viewer_pos, view_radius, &mut visited);

        let visible_nodes = self.nodes.iter().filter(|n| n.visible).count();
        let visible_leaves = self
            .nodes
            .iter()
            .filter(|n| n.visible && n.is_leaf())
            .count();

        self.stats = VisibilityStats {
            visible_nodes,
            visible_leaves,
            nodes_visited: visited,
            frame_time: frame_start.elapsed(),
        };

        tracing::trace!(
            visible = visible_nodes,
            leaves = visible_leaves,
            visited,
            "visibility pass complete"
        );

        self.stats
    }

    fn refine(&mut self, id: NodeId, viewer_pos: Vec3, view_radius: f32, visited: &mut usize) {
        *visited += 1;
        let Some(children) = self.nodes[id.index()].children else {
            self.nodes[id.index()].visible = true;
            return;
        };

        for child in children {
            let near = self.nodes[child.index()]
                .bounds
                .min_corner_distance(viewer_pos)
                < view_radius;
            if near {
                self.refine(child, viewer_pos, view_radius, visited);
            } else {
                self.nodes[child.index()].visible = true;
            }
        }
    }

    /// Run a visibility pass with the stored view radius.
    pub fn refresh(&mut self, viewer_pos: Vec3) -> VisibilityStats {
        self.update_visibility(viewer_pos, self.view_radius)
    }

    pub fn view_radius(&self) -> f32 {
        self.view_radius
    }

    /// Grow or shrink the stored view radius by `delta`, never below zero.
    pub fn adjust_view_radius(&mut self, delta: f32) -> f32 {
        self.view_radius = (self.view_radius + delta).max(0.0);
        tracing::debug!(radius = self.view_radius, "view radius adjusted");
        self.view_radius
    }

    /// Nodes selected by the last visibility pass, in preorder.
    pub fn visible_nodes(&self) -> impl Iterator<Item = &LodNode> {
        self.nodes.iter().filter(|n| n.visible)
    }

    /// Statistics from the last visibility pass.
    pub fn last_stats(&self) -> &VisibilityStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraquad_common::{BoundingQuad, SplitMix};

    fn terrain() -> BoundingQuad {
        BoundingQuad::new(-256.0, 256.0, -256.0, 256.0)
    }

    fn index(depth: u32) -> LodIndex {
        LodIndex::build(terrain(), 512, 512, depth).unwrap()
    }

    /// Every sample point must be covered by exactly one visible node.
    fn assert_visible_set_partitions(index: &LodIndex) {
        let root = index.bounds();
        let visible: Vec<_> = index.visible_nodes().collect();
        let mut rng = SplitMix::new(99);
        for _ in 0..2_000 {
            let p = Vec3::new(
                rng.range_f32(root.left, root.right),
                0.0,
                rng.range_f32(root.top, root.bottom),
            );
            let hits = visible
                .iter()
                .filter(|n| n.bounds.contains_half_open(p, &root))
                .count();
            assert_eq!(hits, 1, "point {p:?} covered by {hits} visible nodes");
        }
    }

    #[test]
    fn zero_radius_shows_root_children() {
        let mut index = index(4);
        let stats = index.update_visibility(Vec3::ZERO, 0.0);

        let visible: Vec<NodeId> = index.visible_nodes().map(|n| n.id).collect();
        assert_eq!(visible, index.root().children.unwrap().to_vec());
        assert!(!index.root().visible);
        assert_eq!(stats.visible_nodes, 4);
        assert_eq!(stats.visible_leaves, 0);
        assert_eq!(stats.nodes_visited, 1);
    }

    #[test]
    fn negative_radius_behaves_like_zero() {
        let mut index = index(3);
        index.update_visibility(Vec3::new(10.0, 0.0, 10.0), -5.0);
        assert_eq!(index.visible_nodes().count(), 4);
        assert!(index.visible_nodes().all(|n| n.depth == 2));
    }

    #[test]
    fn huge_radius_shows_only_deepest_leaves() {
        let mut index = index(4);
        let radius = terrain().diagonal() * 2.0;
        let stats = index.update_visibility(Vec3::new(10.0, 50.0, -10.0), radius);

        assert_eq!(stats.visible_nodes, 64);
        assert_eq!(stats.visible_leaves, 64);
        assert!(index.visible_nodes().all(|n| n.is_leaf() && n.depth == 4));
        assert_eq!(stats.nodes_visited, index.len());
    }

    #[test]
    fn single_leaf_root_is_always_visible() {
        let mut index = LodIndex::build(terrain(), 64, 64, 1).unwrap();
        index.update_visibility(Vec3::ZERO, 0.0);
        assert!(index.root().visible);
        assert_eq!(index.visible_nodes().count(), 1);
    }

    #[test]
    fn detail_concentrates_near_viewer() {
        let mut index = index(5);
        let viewer = Vec3::new(-250.0, 30.0, -250.0);
        index.update_visibility(viewer, 60.0);

        // The leaf under the viewer is drawn at full resolution.
        let under_viewer = index
            .visible_nodes()
            .find(|n| n.bounds.contains(viewer))
            .unwrap();
        assert!(under_viewer.is_leaf());

        // The opposite corner is drawn coarsely.
        let far_corner = Vec3::new(250.0, 0.0, 250.0);
        let far = index
            .visible_nodes()
            .find(|n| n.bounds.contains(far_corner))
            .unwrap();
        assert_eq!(far.depth, 2);

        assert_visible_set_partitions(&index);
    }

    #[test]
    fn recursed_parents_stay_hidden() {
        let mut index = index(4);
        index.update_visibility(Vec3::ZERO, 100.0);
        for node in index.visible_nodes() {
            if let Some(children) = node.children {
                assert!(children.iter().all(|c| !index.node(*c).unwrap().visible));
            }
        }
        assert!(!index.root().visible);
        assert_visible_set_partitions(&index);
    }

    #[test]
    fn pass_resets_previous_frame() {
        let mut index = index(4);
        index.update_visibility(Vec3::ZERO, 1000.0);
        assert_eq!(index.visible_nodes().count(), 64);
        index.update_visibility(Vec3::ZERO, 0.0);
        assert_eq!(index.visible_nodes().count(), 4);
    }

    #[test]
    fn adjust_view_radius_clamps_at_zero() {
        let mut index = index(3);
        assert_eq!(index.view_radius(), 256.0);
        assert_eq!(index.adjust_view_radius(44.0), 300.0);
        assert_eq!(index.adjust_view_radius(-1000.0), 0.0);

        let stats = index.refresh(Vec3::ZERO);
        assert_eq!(stats.visible_nodes, 4);
        assert_eq!(index.last_stats().visible_nodes, 4);
    }
}
