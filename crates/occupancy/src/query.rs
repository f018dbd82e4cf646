use terraquad_common::{EntityRef, KindFilter, SplitMix};

use crate::index::{OccupancyError, OccupancyIndex};

impl OccupancyIndex {
    /// Entities of the requested kind near `origin`.
    ///
    /// The origin's own leaf is always searched in full. Other leaves are
    /// searched when their centroid lies within `radius` of the origin's
    /// position, so the result is a coarse neighborhood rather than a precise
    /// circle. The origin itself is included when it matches `filter`.
    ///
    /// Results come back in a fixed order: the origin leaf's occupants in
    /// placement order, then other leaves in ascending id. Use [`shuffle`] when
    /// callers need the order randomized.
    pub fn range_query(
        &self,
        origin: &EntityRef,
        filter: KindFilter,
        radius: f32,
    ) -> Result<Vec<EntityRef>, OccupancyError> {
        if radius.is_nan() || radius < 0.0 {
            return Err(OccupancyError::InvalidRadius(radius));
        }
        let home = self
            .current_node(origin.id)
            .ok_or(OccupancyError::NotInserted(origin.id))?;

        let _span = tracing::trace_span!("occupancy_range_query", origin = %origin.id).entered();

        let matching = |leaf: &crate::OccNode| {
            leaf.occupants
                .iter()
                .filter(|e| filter.matches(e.kind))
                .copied()
                .collect::<Vec<_>>()
        };

        let mut found = matching(&self.nodes[home.index()]);
        let mut searched = 1usize;

        for id in self.leaves.iter().filter(|id| **id != home) {
            let leaf = &self.nodes[id.index()];
            if leaf.occupants.is_empty() {
                continue;
            }
            if leaf.bounds.centroid_distance(origin.position) <= radius {
                found.extend(matching(leaf));
                searched += 1;
            }
        }

        tracing::trace!(
            leaves = searched,
            found = found.len(),
            ?filter,
            radius,
            "range query complete"
        );
        Ok(found)
    }
}

/// Deterministic Fisher-Yates shuffle driven by `seed`.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = SplitMix::new(seed);
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use terraquad_common::{BoundingQuad, EntityId, EntityKind};

    use super::*;

    fn world() -> BoundingQuad {
        BoundingQuad::new(-100.0, 100.0, -100.0, 100.0)
    }

    fn populated() -> (OccupancyIndex, Vec<EntityRef>) {
        let mut index = OccupancyIndex::build(world(), 4, 2).unwrap();
        let mut rng = SplitMix::new(7);
        let mut placed = Vec::new();
        for i in 0..40 {
            let pos = Vec3::new(rng.range_f32(-100.0, 100.0), 0.0, rng.range_f32(-100.0, 100.0));
            let mut e = if i % 3 == 0 {
                EntityRef::emitter(pos)
            } else {
                EntityRef::agent(pos)
            };
            index.insert(&mut e).unwrap();
            placed.push(e);
        }
        (index, placed)
    }

    fn sorted_ids(entities: &[EntityRef]) -> Vec<EntityId> {
        let mut ids: Vec<_> = entities.iter().map(|e| e.id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn infinite_radius_returns_everything_once() {
        let (index, placed) = populated();
        let found = index
            .range_query(&placed[5], KindFilter::All, f32::INFINITY)
            .unwrap();
        assert_eq!(found.len(), placed.len());
        assert_eq!(sorted_ids(&found), sorted_ids(&placed));
    }

    #[test]
    fn filter_selects_kind() {
        let (index, placed) = populated();
        let emitters = index
            .range_query(&placed[0], KindFilter::Emitters, f32::INFINITY)
            .unwrap();
        assert_eq!(emitters.len(), placed.iter().filter(|e| e.kind == EntityKind::Emitter).count());
        assert!(emitters.iter().all(|e| e.kind == EntityKind::Emitter));

        let agents = index
            .range_query(&placed[0], KindFilter::Agents, f32::INFINITY)
            .unwrap();
        assert_eq!(agents.len() + emitters.len(), placed.len());
    }

    #[test]
    fn zero_radius_returns_own_leaf() {
        let (index, placed) = populated();
        let origin = placed[11];
        let home = index.current_node(origin.id).unwrap();
        let found = index.range_query(&origin, KindFilter::All, 0.0).unwrap();

        let expected: Vec<EntityId> = index
            .node(home)
            .unwrap()
            .occupants()
            .iter()
            .map(|e| e.id)
            .collect();
        let got: Vec<EntityId> = found.iter().map(|e| e.id).collect();
        assert_eq!(got, expected);
        assert!(got.contains(&origin.id));
    }

    #[test]
    fn zero_radius_filters_own_leaf_by_kind() {
        let (index, placed) = populated();
        for origin in [placed[0], placed[1]] {
            let home = index.node(index.current_node(origin.id).unwrap()).unwrap();
            for filter in [KindFilter::Agents, KindFilter::Emitters] {
                let expected: Vec<EntityId> = home
                    .occupants()
                    .iter()
                    .filter(|e| filter.matches(e.kind))
                    .map(|e| e.id)
                    .collect();
                let got: Vec<EntityId> = index
                    .range_query(&origin, filter, 0.0)
                    .unwrap()
                    .iter()
                    .map(|e| e.id)
                    .collect();
                assert_eq!(got, expected, "{filter:?} around {}", origin.id);
                assert_eq!(got.contains(&origin.id), filter.matches(origin.kind));
            }
        }
    }

    #[test]
    fn own_leaf_comes_first_then_ascending_leaves() {
        let (index, placed) = populated();
        let origin = placed[3];
        let home = index.current_node(origin.id).unwrap();
        let found = index
            .range_query(&origin, KindFilter::All, f32::INFINITY)
            .unwrap();

        let leaf_of: Vec<_> = found
            .iter()
            .map(|e| index.current_node(e.id).unwrap())
            .collect();
        let home_count = index.node(home).unwrap().occupancy();
        assert!(leaf_of[..home_count].iter().all(|l| *l == home));
        assert!(leaf_of[home_count..].windows(2).all(|w| w[0] <= w[1]));
        assert!(leaf_of[home_count..].iter().all(|l| *l != home));
    }

    #[test]
    fn radius_selects_leaves_by_centroid() {
        let mut index = OccupancyIndex::build(world(), 2, 1).unwrap();
        let mut a = EntityRef::agent(Vec3::new(10.0, 0.0, 10.0));
        let mut b = EntityRef::agent(Vec3::new(-10.0, 0.0, -10.0));
        index.insert(&mut a).unwrap();
        index.insert(&mut b).unwrap();

        // NW centroid (-50,-50) is ~84.9 from a.
        let near = index.range_query(&a, KindFilter::All, 80.0).unwrap();
        assert_eq!(near.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a.id]);

        let wider = index.range_query(&a, KindFilter::All, 90.0).unwrap();
        assert_eq!(wider.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[test]
    fn stale_caller_copy_still_queries_correctly() {
        let mut index = OccupancyIndex::build(world(), 2, 1).unwrap();
        let mut a = EntityRef::agent(Vec3::new(10.0, 0.0, 10.0));
        index.insert(&mut a).unwrap();
        index.insert(&mut EntityRef::agent(Vec3::new(-10.0, 0.0, -10.0))).unwrap();

        // `a` still says root, but the split moved it.
        assert_eq!(a.current_node, Some(terraquad_common::NodeId::ROOT));
        let found = index.range_query(&a, KindFilter::All, 0.0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn rejects_invalid_radius_and_unknown_origin() {
        let (index, placed) = populated();
        assert_eq!(
            index.range_query(&placed[0], KindFilter::All, -1.0).unwrap_err(),
            OccupancyError::InvalidRadius(-1.0)
        );
        assert!(matches!(
            index.range_query(&placed[0], KindFilter::All, f32::NAN),
            Err(OccupancyError::InvalidRadius(_))
        ));

        let stranger = EntityRef::agent(Vec3::ZERO);
        assert_eq!(
            index.range_query(&stranger, KindFilter::All, 10.0).unwrap_err(),
            OccupancyError::NotInserted(stranger.id)
        );
    }

    #[test]
    fn shuffle_is_seeded_permutation() {
        let ordered: Vec<u32> = (0..50).collect();
        let mut a = ordered.clone();
        let mut b = ordered.clone();
        shuffle(&mut a, 42);
        shuffle(&mut b, 42);
        assert_eq!(a, b);
        assert_ne!(a, ordered);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, ordered);

        let mut empty: Vec<u32> = Vec::new();
        shuffle(&mut empty, 1);
        assert!(empty.is_empty());
    }
}
