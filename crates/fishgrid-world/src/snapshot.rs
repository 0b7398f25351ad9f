//! Read-only, serializable copies of the grid for hosts and hashing.
//!
//! A [`WorldSnapshot`] holds no references into the [`World`], so a renderer
//! can keep it across ticks without being able to touch live state.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntityKind, Position};
use crate::world::World;

/// A copy of one registered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    #[serde(flatten)]
    pub kind: EntityKind,
    pub position: Position,
    pub player: bool,
}

impl From<&Entity> for EntitySnapshot {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            kind: *entity.kind(),
            position: entity.position(),
            player: entity.is_player(),
        }
    }
}

/// Every registered entity, in registry order, plus the grid size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: i32,
    pub height: i32,
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// Snapshots of everything on `position`, in registry order.
    pub fn at(&self, position: Position) -> impl Iterator<Item = &EntitySnapshot> + '_ {
        self.entities.iter().filter(move |e| e.position == position)
    }
}

impl World {
    /// Copy the registry into a [`WorldSnapshot`].
    pub fn capture_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            width: self.width(),
            height: self.height(),
            entities: self.entities().map(EntitySnapshot::from).collect(),
        }
    }
}
