//! The game session: one player fish searching the grid for its missing
//! friends.
//!
//! Every non-player fish is in exactly one of three collections:
//!
//! - **missing** -- wandering the grid on its own;
//! - **found** -- trailing the player in a chain;
//! - **home** -- taken off the grid for good.
//!
//! Fish move `missing -> found` when the player swims onto them, `found ->
//! home` when the player reaches the fish home, and may slip back `found ->
//! missing` once the chain is long enough. A missing fish that wanders onto
//! the home tile goes `missing -> home` by itself.
//!
//! Each [`Session::step`] runs, in order:
//!
//! 1. pickup spawning (hearts and bubbles, independently);
//! 2. the step counter;
//! 3. collection of everything sharing the player's tile;
//! 4. the chance of losing the last found fish;
//! 5. wandering of missing fish;
//! 6. the follow trail;
//! 7. the world's own movers (snails).
//!
//! All randomness comes from one [`Pcg64`] seeded from
//! [`SessionConfig::seed`], so the same config and the same inputs always
//! produce the same game.

use fishgrid_world::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Points for finding an ordinary fish.
pub const FOUND_POINTS: i64 = 10;
/// Points for finding the [`RARE_COLOR`] fish.
pub const RARE_FOUND_POINTS: i64 = 110;
/// Extra points when the found fish is a fast scarer.
pub const FAST_SCARE_BONUS: i64 = 10;
/// Points for swimming onto a heart.
pub const HEART_POINTS: i64 = 520;

/// What a fish is worth when found, and what is deducted if it gets lost.
pub fn fish_points(fish: &Fish) -> i64 {
    let base = if fish.color == RARE_COLOR {
        RARE_FOUND_POINTS
    } else {
        FOUND_POINTS
    };
    if fish.fast_scare {
        base + FAST_SCARE_BONUS
    } else {
        base
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Everything that shapes a session. Two sessions built from equal configs
/// and fed equal inputs stay identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub width: i32,
    pub height: i32,
    /// Seed for the session's only random source.
    pub seed: u64,
    /// Number of fish colors, including the player's. One missing fish is
    /// created for every color but the player's.
    pub fish_colors: u8,
    /// Rocks placed at start; each is a plain or a falling rock with equal
    /// odds.
    pub rocks: usize,
    pub snails: usize,
    /// Per-step chance of spawning a heart.
    pub heart_chance: f64,
    /// Per-step chance of spawning a bubble.
    pub bubble_chance: f64,
    /// Per-step chance of losing the last found fish, once eligible.
    pub lost_fish_chance: f64,
    /// Fish can only get lost from this step on.
    pub lost_fish_min_steps: u64,
    /// Per-step chance a fast-scare missing fish tries to move.
    pub fast_wander_chance: f64,
    /// Per-step chance any other missing fish tries to move.
    pub slow_wander_chance: f64,
    /// Chance each missing fish is created as a fast scarer.
    pub fast_scare_chance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            seed: 0,
            fish_colors: 8,
            rocks: 10,
            snails: 2,
            heart_chance: 0.02,
            bubble_chance: 0.02,
            lost_fish_chance: 0.1,
            lost_fish_min_steps: 20,
            fast_wander_chance: 0.8,
            slow_wander_chance: 0.3,
            fast_scare_chance: 0.5,
        }
    }
}

impl SessionConfig {
    /// Check that every chance is a probability and that there is at least
    /// one fish to find. Grid dimensions are checked by [`World::new`].
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.fish_colors < 2 {
            return Err(SessionError::InvalidConfig(format!(
                "fish_colors must be at least 2, got {}",
                self.fish_colors
            )));
        }
        let chances = [
            ("heart_chance", self.heart_chance),
            ("bubble_chance", self.bubble_chance),
            ("lost_fish_chance", self.lost_fish_chance),
            ("fast_wander_chance", self.fast_wander_chance),
            ("slow_wander_chance", self.slow_wander_chance),
            ("fast_scare_chance", self.fast_scare_chance),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(SessionError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inputs & events
// ---------------------------------------------------------------------------

/// One thing the host asks for between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    Move(Direction),
    Click { x: i32, y: i32 },
}

/// The player actions applied before one step, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    pub actions: Vec<PlayerAction>,
}

impl InputFrame {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Something that happened during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A heart or bubble appeared.
    Spawned { entity: EntityId, kind: EntityKind },
    /// The player found a missing fish.
    FishFound { entity: EntityId, points: i64 },
    /// The last found fish slipped back into the missing set.
    FishLost { entity: EntityId, points: i64 },
    /// A fish reached home, escorted by the player or on its own.
    FishReturned { entity: EntityId, escorted: bool },
    HeartCollected { entity: EntityId, points: i64 },
    BubbleCollected { entity: EntityId },
    /// A wandering fish swam over a pickup and it vanished.
    PickupConsumed { entity: EntityId, by: EntityId },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single play session.
pub struct Session {
    config: SessionConfig,
    world: World,
    rng: Pcg64,
    player: EntityId,
    fish_home: EntityId,
    missing: Vec<EntityId>,
    found: Vec<EntityId>,
    /// Fish that made it home. They are no longer on the grid, so the
    /// session owns them.
    home: Vec<Entity>,
    steps_taken: u64,
    score: i64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("seed", &self.config.seed)
            .field("steps_taken", &self.steps_taken)
            .field("score", &self.score)
            .field("missing", &self.missing.len())
            .field("found", &self.found.len())
            .field("home", &self.home.len())
            .finish()
    }
}

impl Session {
    /// Create a session on a `width x height` grid with default settings and
    /// a fresh random seed. The seed is kept in [`config`](Self::config).
    pub fn new(width: i32, height: i32) -> Result<Self, SessionError> {
        Self::with_config(SessionConfig {
            width,
            height,
            seed: rand::random(),
            ..SessionConfig::default()
        })
    }

    /// Create a session from an explicit configuration.
    ///
    /// Placement order: the fish home, one heart, one bubble, the rocks, the
    /// snails, the player (on the home tile), then one missing fish per
    /// non-player color.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidConfig`] if the config does not validate.
    /// - [`SessionError::World`] if the grid is invalid or too small to hold
    ///   everything.
    pub fn with_config(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let mut rng = Pcg64::seed_from_u64(config.seed);
        let mut world = World::new(config.width, config.height)?;

        let fish_home = world.insert_fish_home(&mut rng)?;
        world.insert_heart(&mut rng)?;
        world.insert_bubble(&mut rng)?;
        for _ in 0..config.rocks {
            if rng.gen::<f64>() < 0.5 {
                world.insert_rock_randomly(&mut rng)?;
            } else {
                world.insert_falling_rock_randomly(&mut rng)?;
            }
        }
        for _ in 0..config.snails {
            world.insert_snail_randomly(&mut rng)?;
        }

        let home_tile = world
            .get(fish_home)
            .map(Entity::position)
            .ok_or(SessionError::UntrackedEntity { entity: fish_home })?;
        let mut player = world.create(EntityKind::Fish(Fish::new(PLAYER_COLOR, false)));
        player.set_position(home_tile);
        player.mark_as_player();
        let player = world.register(player)?;

        let mut missing = Vec::with_capacity(usize::from(config.fish_colors) - 1);
        for color in (PLAYER_COLOR + 1)..config.fish_colors {
            let fast_scare = rng.gen::<f64>() < config.fast_scare_chance;
            missing.push(world.insert_fish_randomly(color, fast_scare, &mut rng)?);
        }

        tracing::debug!(
            seed = config.seed,
            width = config.width,
            height = config.height,
            missing = missing.len(),
            "session created"
        );

        Ok(Self {
            config,
            world,
            rng,
            player,
            fish_home,
            missing,
            found: Vec::new(),
            home: Vec::new(),
            steps_taken: 0,
            score: 0,
        })
    }

    // -- host surface -------------------------------------------------------

    /// Advance the game by one tick.
    ///
    /// Returns what happened, in order. An `Err` is fatal: the grid ran out
    /// of space for a pickup, or the session's bookkeeping is inconsistent.
    /// The session should not be stepped again after an error.
    pub fn step(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let mut events = Vec::new();
        self.spawn_pickups(&mut events)?;
        self.steps_taken += 1;
        self.collect_at_player(&mut events)?;
        self.maybe_lose_fish(&mut events)?;
        self.wander_missing_fish(&mut events)?;
        self.world.follow(self.player, &self.found);
        self.world.step_all();

        tracing::trace!(
            step = self.steps_taken,
            score = self.score,
            missing = self.missing.len(),
            found = self.found.len(),
            home = self.home.len(),
            "step"
        );
        Ok(events)
    }

    /// Apply the frame's actions in order, then [`step`](Self::step).
    pub fn advance(&mut self, input: &InputFrame) -> Result<Vec<SessionEvent>, SessionError> {
        for action in &input.actions {
            match *action {
                PlayerAction::Move(direction) => {
                    self.move_player(direction);
                }
                PlayerAction::Click { x, y } => {
                    self.click(x, y);
                }
            }
        }
        self.step()
    }

    /// Try to move the player one tile. Returns whether it moved.
    pub fn move_player(&mut self, direction: Direction) -> bool {
        self.world.move_entity(self.player, direction)
    }

    /// Destroy any rock (plain or falling) or bubble on the tile. Returns
    /// how many entities were removed; anything else on the tile is left
    /// alone.
    pub fn click(&mut self, x: i32, y: i32) -> usize {
        let mut removed = 0;
        for id in self.world.find(Position::new(x, y)) {
            let clickable = self
                .world
                .get(id)
                .is_some_and(|e| e.kind().is_rock() || matches!(e.kind(), EntityKind::Bubble));
            if clickable && self.world.remove(id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(x, y, removed, "click cleared tile");
        }
        removed
    }

    /// Fish the player has not found yet, including ones that got lost
    /// again.
    pub fn missing_fish_left(&self) -> usize {
        self.missing.len()
    }

    /// Length of the chain trailing the player.
    pub fn found_count(&self) -> usize {
        self.found.len()
    }

    /// Fish safely home.
    pub fn home_count(&self) -> usize {
        self.home.len()
    }

    /// True once every non-player color is home.
    pub fn is_game_over(&self) -> bool {
        self.home.len() == usize::from(self.config.fish_colors) - 1
    }

    /// The live grid entities in registry order. Borrowed read-only.
    pub fn view_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.world.entities()
    }

    // -- accessors ----------------------------------------------------------

    /// The config this session was built from, seed included.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shared view of the grid.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Id of the player fish.
    pub fn player(&self) -> EntityId {
        self.player
    }

    /// The player's tile. Always `Some` while the session is healthy.
    pub fn player_position(&self) -> Option<Position> {
        self.world.get(self.player).map(Entity::position)
    }

    /// Id of the fish home marker.
    pub fn fish_home(&self) -> EntityId {
        self.fish_home
    }

    /// Missing fish, in the order they went missing.
    pub fn missing(&self) -> &[EntityId] {
        &self.missing
    }

    /// Found fish, oldest first. The last one is the first to get lost.
    pub fn found(&self) -> &[EntityId] {
        &self.found
    }

    /// Fish taken off the grid, in arrival order.
    pub fn home(&self) -> &[Entity] {
        &self.home
    }

    /// Current score. Can dip when fish get lost.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Steps run so far.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    // -- step phases --------------------------------------------------------

    fn spawn_pickups(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), SessionError> {
        if self.rng.gen::<f64>() < self.config.heart_chance {
            let entity = self.world.insert_heart(&mut self.rng)?;
            events.push(SessionEvent::Spawned {
                entity,
                kind: EntityKind::Heart,
            });
        }
        if self.rng.gen::<f64>() < self.config.bubble_chance {
            let entity = self.world.insert_bubble(&mut self.rng)?;
            events.push(SessionEvent::Spawned {
                entity,
                kind: EntityKind::Bubble,
            });
        }
        Ok(())
    }

    /// Look up the fish attributes of a tracked fish.
    fn tracked_fish(&self, id: EntityId) -> Result<Fish, SessionError> {
        self.world
            .get(id)
            .and_then(Entity::as_fish)
            .copied()
            .ok_or(SessionError::NotAFish { entity: id })
    }

    fn collect_at_player(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), SessionError> {
        // Snapshot first: collecting removes entities from the registry.
        let overlap = self.world.find_same_cell(self.player);
        for id in overlap {
            if let Some(slot) = self.missing.iter().position(|&m| m == id) {
                let fish = self.tracked_fish(id)?;
                self.missing.remove(slot);
                self.found.push(id);
                let points = fish_points(&fish);
                self.score += points;
                tracing::debug!(entity = %id, color = fish.color, points, "fish found");
                events.push(SessionEvent::FishFound { entity: id, points });
                continue;
            }

            match self.world.get(id).map(|e| *e.kind()) {
                Some(EntityKind::Heart) => {
                    self.world.remove(id);
                    self.score += HEART_POINTS;
                    events.push(SessionEvent::HeartCollected {
                        entity: id,
                        points: HEART_POINTS,
                    });
                }
                Some(EntityKind::Bubble) => {
                    self.world.remove(id);
                    events.push(SessionEvent::BubbleCollected { entity: id });
                }
                Some(EntityKind::FishHome) => self.bring_found_home(events)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn bring_found_home(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), SessionError> {
        for id in std::mem::take(&mut self.found) {
            let fish = self
                .world
                .remove(id)
                .ok_or(SessionError::UntrackedEntity { entity: id })?;
            tracing::debug!(entity = %id, "fish escorted home");
            self.home.push(fish);
            events.push(SessionEvent::FishReturned {
                entity: id,
                escorted: true,
            });
        }
        Ok(())
    }

    fn maybe_lose_fish(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), SessionError> {
        if self.found.len() <= 1 || self.steps_taken < self.config.lost_fish_min_steps {
            return Ok(());
        }
        if self.rng.gen::<f64>() >= self.config.lost_fish_chance {
            return Ok(());
        }
        let Some(&id) = self.found.last() else {
            return Ok(());
        };
        let fish = self.tracked_fish(id)?;
        self.found.pop();
        self.missing.push(id);
        let points = fish_points(&fish);
        self.score -= points;
        tracing::debug!(entity = %id, points, "fish lost");
        events.push(SessionEvent::FishLost { entity: id, points });
        Ok(())
    }

    fn wander_missing_fish(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), SessionError> {
        let wanderers = self.missing.clone();
        let mut returned = Vec::new();

        for id in wanderers {
            let fish = self.tracked_fish(id)?;
            let chance = if fish.fast_scare {
                self.config.fast_wander_chance
            } else {
                self.config.slow_wander_chance
            };
            if self.rng.gen::<f64>() < chance {
                self.world.move_randomly(id, &mut self.rng);
            }

            let mut reached_home = false;
            for other in self.world.find_same_cell(id) {
                match self.world.get(other).map(|e| *e.kind()) {
                    Some(EntityKind::FishHome) => reached_home = true,
                    Some(EntityKind::Heart | EntityKind::Bubble) => {
                        self.world.remove(other);
                        events.push(SessionEvent::PickupConsumed {
                            entity: other,
                            by: id,
                        });
                    }
                    _ => {}
                }
            }

            if reached_home {
                let fish = self
                    .world
                    .remove(id)
                    .ok_or(SessionError::UntrackedEntity { entity: id })?;
                tracing::debug!(entity = %id, "fish swam home on its own");
                self.home.push(fish);
                returned.push(id);
                events.push(SessionEvent::FishReturned {
                    entity: id,
                    escorted: false,
                });
            }
        }

        self.missing.retain(|id| !returned.contains(id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
