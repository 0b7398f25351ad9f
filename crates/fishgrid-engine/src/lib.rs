//! FishGrid Engine -- the game session that drives a [`fishgrid_world`] grid.
//!
//! A [`Session`](session::Session) owns the world, the player fish, and the
//! missing/found/home bookkeeping. The host calls
//! [`step`](session::Session::step) once per tick, forwards clicks and
//! player moves, and reads entities back for drawing.
//!
//! # Quick Start
//!
//! ```
//! use fishgrid_engine::prelude::*;
//!
//! let mut session = Session::with_config(SessionConfig {
//!     seed: 7,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! session.move_player(Direction::Down);
//! let _events = session.step().unwrap();
//!
//! assert_eq!(session.steps_taken(), 1);
//! assert_eq!(
//!     session.missing_fish_left() + session.found().len() + session.home().len(),
//!     7
//! );
//! for entity in session.view_entities() {
//!     let _tile = entity.position();
//! }
//! ```

#![deny(unsafe_code)]

pub mod replay;
pub mod session;
pub mod snapshot;

/// Re-export the world crate for convenience.
pub use fishgrid_world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that end a session. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The world rejected an operation, most often because it is full.
    #[error(transparent)]
    World(#[from] fishgrid_world::WorldError),

    /// The configuration cannot produce a playable session.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    /// An entity tracked as a fish is not a fish. Internal bookkeeping bug.
    #[error("entity {entity:?} is tracked as a fish but is not one")]
    NotAFish {
        entity: fishgrid_world::entity::EntityId,
    },

    /// An entity tracked by the session is no longer on the grid.
    #[error("entity {entity:?} is tracked by the session but not registered in the world")]
    UntrackedEntity {
        entity: fishgrid_world::entity::EntityId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use fishgrid_world::prelude::*;

    pub use crate::replay::{
        replay, Divergence, RecordedFrame, ReplayDivergence, ReplayLog, ReplayRecorder,
        ReplayResult,
    };
    pub use crate::session::{
        fish_points, InputFrame, PlayerAction, Session, SessionConfig, SessionEvent,
        FAST_SCARE_BONUS, FOUND_POINTS, HEART_POINTS, RARE_FOUND_POINTS,
    };
    pub use crate::snapshot::SessionSnapshot;
    pub use crate::SessionError;
}
