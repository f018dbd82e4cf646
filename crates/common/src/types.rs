use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity placed in an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for compact reports.
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable index of a node inside a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a tree node has children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Internal,
    Leaf,
}

/// What an occupant is, as far as the indices care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mobile agent (predator, prey, ...).
    Agent,
    /// A static or slow environmental emitter (food source, scent, ...).
    Emitter,
}

/// Kind selector used by neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KindFilter {
    Agents,
    Emitters,
    #[default]
    All,
}

impl KindFilter {
    pub fn matches(self, kind: EntityKind) -> bool {
        match self {
            Self::Agents => kind == EntityKind::Agent,
            Self::Emitters => kind == EntityKind::Emitter,
            Self::All => true,
        }
    }
}

impl From<EntityKind> for KindFilter {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Agent => Self::Agents,
            EntityKind::Emitter => Self::Emitters,
        }
    }
}

/// The capability an entity must expose to be placed in an occupancy index.
///
/// Behavior code owns its entities; the index only ever reads these three
/// properties and keeps an [`EntityRef`] snapshot of them.
pub trait Occupant {
    fn id(&self) -> EntityId;
    fn kind(&self) -> EntityKind;
    fn position(&self) -> Vec3;
}

/// A copied view of an entity: id, kind and position, plus the leaf the
/// occupancy index last placed it in.
///
/// `current_node` is written by the index on insert and update. Occupants
/// moved by a later subdivision are tracked by the index itself, so a caller's
/// copy can lag behind; the index's own lookup is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub current_node: Option<NodeId>,
}

impl EntityRef {
    pub fn new(kind: EntityKind, position: Vec3) -> Self {
        Self::with_id(EntityId::new(), kind, position)
    }

    pub fn with_id(id: EntityId, kind: EntityKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            current_node: None,
        }
    }

    pub fn agent(position: Vec3) -> Self {
        Self::new(EntityKind::Agent, position)
    }

    pub fn emitter(position: Vec3) -> Self {
        Self::new(EntityKind::Emitter, position)
    }

    /// Snapshot any occupant into a detached reference.
    pub fn from_occupant<O: Occupant + ?Sized>(occupant: &O) -> Self {
        Self::with_id(occupant.id(), occupant.kind(), occupant.position())
    }
}

impl Occupant for EntityRef {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Prey {
        id: EntityId,
        at: Vec3,
    }

    impl Occupant for Prey {
        fn id(&self) -> EntityId {
            self.id
        }

        fn kind(&self) -> EntityKind {
            EntityKind::Agent
        }

        fn position(&self) -> Vec3 {
            self.at
        }
    }

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn entity_id_short_is_eight_chars() {
        assert_eq!(EntityId::new().short().len(), 8);
    }

    #[test]
    fn kind_filter_matches() {
        assert!(KindFilter::All.matches(EntityKind::Agent));
        assert!(KindFilter::All.matches(EntityKind::Emitter));
        assert!(KindFilter::Agents.matches(EntityKind::Agent));
        assert!(!KindFilter::Agents.matches(EntityKind::Emitter));
        assert!(KindFilter::Emitters.matches(EntityKind::Emitter));
        assert!(!KindFilter::Emitters.matches(EntityKind::Agent));
    }

    #[test]
    fn kind_filter_from_kind() {
        assert_eq!(KindFilter::from(EntityKind::Agent), KindFilter::Agents);
        assert_eq!(KindFilter::from(EntityKind::Emitter), KindFilter::Emitters);
    }

    #[test]
    fn entity_ref_from_occupant_is_unplaced() {
        let prey = Prey {
            id: EntityId::new(),
            at: Vec3::new(3.0, 1.0, -2.0),
        };
        let r = EntityRef::from_occupant(&prey);
        assert_eq!(r.id, prey.id);
        assert_eq!(r.kind, EntityKind::Agent);
        assert_eq!(r.position, prey.at);
        assert!(r.current_node.is_none());
    }

    #[test]
    fn node_id_root_is_zero() {
        assert_eq!(NodeId::ROOT.index(), 0);
        assert_eq!(NodeId(7).to_string(), "7");
    }
}
