//! Session snapshots with BLAKE3 hashing.
//!
//! A [`SessionSnapshot`] is a serializable copy of everything that decides
//! how a session plays on: the grid, the step counter, the score and the
//! three fish collections. Its `hash` is a BLAKE3 hex digest of that state,
//! used to compare runs for determinism.
//!
//! Snapshots live in memory only; nothing here restores a session.
//!
//! ```
//! use fishgrid_engine::prelude::*;
//!
//! let config = SessionConfig { seed: 11, ..Default::default() };
//! let mut a = Session::with_config(config.clone()).unwrap();
//! let mut b = Session::with_config(config).unwrap();
//! for _ in 0..30 {
//!     a.step().unwrap();
//!     b.step().unwrap();
//! }
//! assert_eq!(a.state_hash(), b.state_hash());
//! assert_eq!(a.capture_snapshot().hash.len(), 64);
//! ```

use fishgrid_world::entity::{Entity, EntityId};
use fishgrid_world::snapshot::WorldSnapshot;
use serde::{Deserialize, Serialize};

use crate::session::Session;

/// A serializable copy of session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Registered entities in registry order.
    pub world: WorldSnapshot,
    pub steps_taken: u64,
    pub score: i64,
    pub missing: Vec<EntityId>,
    pub found: Vec<EntityId>,
    /// Ids of fish that made it home, in arrival order.
    pub home: Vec<EntityId>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HashableState<'a> {
    world: &'a WorldSnapshot,
    steps_taken: u64,
    score: i64,
    missing: &'a [EntityId],
    found: &'a [EntityId],
    home: &'a [EntityId],
}

fn compute_hash(state: &HashableState<'_>) -> String {
    let json_bytes = serde_json::to_vec(state)
        .expect("session state should always be JSON-serializable");
    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Session snapshot methods
// ---------------------------------------------------------------------------

impl Session {
    /// Copy the current state and hash it.
    pub fn capture_snapshot(&self) -> SessionSnapshot {
        let world = self.world().capture_snapshot();
        let home: Vec<EntityId> = self.home().iter().map(Entity::id).collect();
        let hash = compute_hash(&HashableState {
            world: &world,
            steps_taken: self.steps_taken(),
            score: self.score(),
            missing: self.missing(),
            found: self.found(),
            home: &home,
        });
        SessionSnapshot {
            world,
            steps_taken: self.steps_taken(),
            score: self.score(),
            missing: self.missing().to_vec(),
            found: self.found().to_vec(),
            home,
            hash,
        }
    }

    /// The BLAKE3 hex digest of the current state.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }
}

impl SessionSnapshot {
    /// Recompute the digest from the snapshot's own fields and compare it
    /// with `hash`.
    pub fn verify(&self) -> bool {
        compute_hash(&HashableState {
            world: &self.world,
            steps_taken: self.steps_taken,
            score: self.score,
            missing: &self.missing,
            found: &self.found,
            home: &self.home,
        }) == self.hash
    }
}
