//! FishGrid World -- the tile grid, its entities, and the movement rules.
//!
//! The [`World`](world::World) is an ordered registry of [`Entity`](entity::Entity)
//! values on a `width x height` grid of integer tiles. It answers spatial
//! queries, places new entities on free tiles, and decides whether a mover
//! may enter a tile ([`World::can_swim`](world::World::can_swim)).
//!
//! Randomness is never owned here: every operation that draws takes the
//! caller's RNG so a seeded session stays reproducible.
//!
//! # Quick Start
//!
//! ```
//! use fishgrid_world::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let mut world = World::new(8, 8).unwrap();
//! let home = world.insert_fish_home(&mut rng).unwrap();
//! let rock = world.insert_rock_randomly(&mut rng).unwrap();
//!
//! let rock_tile = world.get(rock).unwrap().position();
//! let visitor = world.create(EntityKind::Fish(Fish::new(1, false)));
//! assert!(!world.can_swim(&visitor, rock_tile));
//! assert_eq!(world.find(world.get(home).unwrap().position()), vec![home]);
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod snapshot;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// Both grid sides must be positive.
    #[error("invalid world dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    /// No free tile is left to place a new entity on.
    #[error("the {width}x{height} world is too small: no unused tile left")]
    WorldFull { width: i32, height: i32 },

    /// A position lies outside the grid.
    #[error("position {position} is outside the world")]
    OutOfBounds { position: entity::Position },

    /// The entity is already in the registry.
    #[error("entity {entity:?} is already registered")]
    AlreadyRegistered { entity: entity::EntityId },

    /// The id was never issued by this world, or its entity was removed.
    #[error("entity {entity} was removed or never spawned in this world")]
    StaleEntity { entity: entity::EntityId },

    /// A freshly placed entity could not be found on its own tile.
    #[error("entity {entity:?} is not found at its own position {position}")]
    NotFoundAtPosition {
        entity: entity::EntityId,
        position: entity::Position,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{
        Direction, Entity, EntityId, EntityKind, Fish, Position, PositionHistory, Snail,
        HISTORY_CAPACITY, PLAYER_COLOR, RARE_COLOR,
    };
    pub use crate::snapshot::{EntitySnapshot, WorldSnapshot};
    pub use crate::world::World;
    pub use crate::WorldError;
}
