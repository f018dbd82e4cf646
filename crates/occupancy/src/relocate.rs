use glam::Vec3;
use terraquad_common::{EntityId, EntityRef, NodeId};

use crate::index::{OccupancyError, OccupancyIndex};

impl OccupancyIndex {
    /// Move an already placed entity to `new_pos`.
    ///
    /// Stays in its leaf when the leaf still owns `new_pos`; otherwise it is
    /// detached and placed again from the root, which may split a leaf. On
    /// success `entity` carries the new position and leaf.
    pub fn update(&mut self, entity: &mut EntityRef, new_pos: Vec3) -> Result<NodeId, OccupancyError> {
        let leaf = self
            .current_node(entity.id)
            .ok_or(OccupancyError::NotInserted(entity.id))?;
        if !self.is_in_bounds(new_pos) {
            return Err(OccupancyError::OutOfBounds {
                x: new_pos.x,
                z: new_pos.z,
            });
        }

        let world = self.bounds();
        if self.nodes[leaf.index()].bounds.contains_half_open(new_pos, &world) {
            if let Some(stored) = self.nodes[leaf.index()]
                .occupants
                .iter_mut()
                .find(|e| e.id == entity.id)
            {
                stored.position = new_pos;
            }
            entity.position = new_pos;
            entity.current_node = Some(leaf);
            return Ok(leaf);
        }

        let mut moved = self.detach(leaf, entity.id)?;
        let old_pos = moved.position;
        moved.position = new_pos;
        match self.place(NodeId::ROOT, moved) {
            Ok(target) => {
                tracing::debug!(id = %entity.id, from = %leaf, to = %target, "entity changed leaf");
                entity.position = new_pos;
                entity.current_node = Some(target);
                Ok(target)
            }
            Err(err) => {
                moved.position = old_pos;
                self.attach(leaf, moved);
                Err(err)
            }
        }
    }

    /// Take entity `id` out of the index, returning its stored snapshot.
    ///
    /// The leaf it occupied stays in the tree; splits are never undone.
    pub fn remove(&mut self, id: EntityId) -> Result<EntityRef, OccupancyError> {
        let leaf = self
            .current_node(id)
            .ok_or(OccupancyError::NotInserted(id))?;
        let mut removed = self.detach(leaf, id)?;
        removed.current_node = None;
        tracing::debug!(%id, leaf = %leaf, "entity removed");
        Ok(removed)
    }

    fn detach(&mut self, leaf: NodeId, id: EntityId) -> Result<EntityRef, OccupancyError> {
        let node = &mut self.nodes[leaf.index()];
        let pos = node.occupants.iter().position(|e| e.id == id).ok_or_else(|| {
            OccupancyError::InvariantViolation(format!("entity {id} missing from leaf {leaf}"))
        })?;
        let entity = node.occupants.remove(pos);
        if node.occupants.is_empty() {
            node.visible = false;
        }
        self.locations.remove(&id);
        Ok(entity)
    }
}
