//! Entity ids, tile positions, and the closed set of entity kinds.
//!
//! Ids are spawn serial numbers handed out by the world's [`IdSequence`]:
//! the fish home placed first is `#0`, the next spawn `#1`, and so on. They
//! are never reused, so a fish the session took home keeps its number for
//! good and a heart eaten on tick 12 cannot be confused with the bubble
//! spawned on tick 13.
//!
//! Every [`Entity`] carries a bounded, most-recent-first [`PositionHistory`]
//! which the follow trail reads to place found fish behind the player.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// How many past positions each entity remembers.
pub const HISTORY_CAPACITY: usize = 64;

/// Color index reserved for the player fish.
pub const PLAYER_COLOR: u8 = 0;

/// Color index of the rare fish, worth extra points when found.
pub const RARE_COLOR: u8 = 6;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Spawn serial number of an entity within one world.
///
/// Ordering follows spawn order, which is also the order ids appear in
/// snapshots and replay logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw serial number. Only meaningful for ids read back from a
    /// snapshot or built in tests; live ids come from [`IdSequence`].
    pub const fn from_raw(serial: u64) -> Self {
        Self(serial)
    }

    /// The serial number.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId(#{})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IdSequence
// ---------------------------------------------------------------------------

/// Issues [`EntityId`]s in spawn order and remembers which ones have left
/// the grid.
///
/// A retired id stays retired: the world refuses to register it again, so a
/// fish that went home cannot reappear on the grid under its old number.
#[derive(Debug, Default)]
pub struct IdSequence {
    next: u64,
    retired: HashSet<EntityId>,
}

impl IdSequence {
    /// An empty sequence; the first id issued is `#0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next serial number.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Mark `id` as gone from the grid for good.
    ///
    /// Returns `false` if it was never issued or is already retired.
    pub fn retire(&mut self, id: EntityId) -> bool {
        self.is_issued(id) && self.retired.insert(id)
    }

    /// Whether `id` was handed out by this sequence.
    pub fn is_issued(&self, id: EntityId) -> bool {
        id.0 < self.next
    }

    /// Whether `id` was issued and has not been retired.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.is_issued(id) && !self.retired.contains(&id)
    }

    /// How many ids have been issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Position & Direction
// ---------------------------------------------------------------------------

/// Integer tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Column, growing to the right.
    pub x: i32,
    /// Row, growing downwards.
    pub y: i32,
}

impl Position {
    /// The tile at column `x`, row `y`.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring tile one step in `direction`. May be out of bounds.
    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four orthogonal moves. `Up` decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in clockwise order starting from `Up`.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// The `(dx, dy)` one step in this direction moves by.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    /// The next direction clockwise. Snails turn this way when blocked.
    pub fn turn_clockwise(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }
}

// ---------------------------------------------------------------------------
// PositionHistory
// ---------------------------------------------------------------------------

/// Fixed-capacity record of recent positions, most recent first.
///
/// Entry 0 is always the entity's current tile once it has been placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionHistory {
    entries: VecDeque<Position>,
    capacity: usize,
}

impl PositionHistory {
    /// An empty history keeping at most `capacity` positions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push `position` to the front, evicting the oldest entry past capacity.
    pub fn record(&mut self, position: Position) {
        self.entries.push_front(position);
        self.entries.truncate(self.capacity);
    }

    /// The position recorded `ticks_ago` updates back (0 = current).
    pub fn get(&self, ticks_ago: usize) -> Option<Position> {
        self.entries.get(ticks_ago).copied()
    }

    /// Number of positions recorded so far, up to the capacity.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True until the entity is first placed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most positions this history keeps.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Recorded positions, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Per-fish attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fish {
    /// Palette index. [`PLAYER_COLOR`] is the player; [`RARE_COLOR`] scores
    /// extra.
    pub color: u8,
    /// Skittish fish wander far more often.
    pub fast_scare: bool,
}

impl Fish {
    /// A fish of palette `color`.
    pub fn new(color: u8, fast_scare: bool) -> Self {
        Self { color, fast_scare }
    }
}

/// A snail crawls along its heading and turns clockwise when blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snail {
    /// The direction it will try next.
    pub heading: Direction,
}

impl Default for Snail {
    fn default() -> Self {
        Self {
            heading: Direction::Right,
        }
    }
}

/// The closed set of things that can occupy a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    /// The player or one of the fish it is looking for.
    Fish(Fish),
    /// Static obstacle, cleared by a click.
    Rock,
    /// Blocks exactly like [`EntityKind::Rock`]. Kept as its own variant so a
    /// falling behaviour can be added without touching callers.
    FallingRock,
    /// Obstacle that crawls by itself.
    Snail(Snail),
    /// Where found fish are brought back to. One per world.
    FishHome,
    /// Pickup worth points to the player.
    Heart,
    /// Pickup with no score value, cleared by a click.
    Bubble,
}

impl EntityKind {
    /// Short human-readable name, used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Fish(_) => "fish",
            EntityKind::Rock => "rock",
            EntityKind::FallingRock => "falling_rock",
            EntityKind::Snail(_) => "snail",
            EntityKind::FishHome => "fish_home",
            EntityKind::Heart => "heart",
            EntityKind::Bubble => "bubble",
        }
    }

    /// Rocks of either flavour.
    pub fn is_rock(&self) -> bool {
        matches!(self, EntityKind::Rock | EntityKind::FallingRock)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A placed (or placeable) occupant of the grid.
///
/// Entities are created by [`World::create`](crate::world::World::create)
/// so that they always carry a valid id.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    position: Position,
    /// Every tile it was placed on, newest first.
    history: PositionHistory,
    player: bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            position: Position::new(0, 0),
            history: PositionHistory::default(),
            player: false,
        }
    }

    /// The spawn serial number.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// What this entity is.
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    /// The tile it currently occupies.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Move to `position` and record it in the history.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
        self.history.record(position);
    }

    /// Past tiles, newest first. Entry 0 is the current tile.
    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    /// Whether this is the fish the host controls.
    pub fn is_player(&self) -> bool {
        self.player
    }

    /// Flag this entity as the externally controlled player.
    pub fn mark_as_player(&mut self) {
        self.player = true;
    }

    /// The fish attributes, if this is a fish.
    pub fn as_fish(&self) -> Option<&Fish> {
        match &self.kind {
            EntityKind::Fish(fish) => Some(fish),
            _ => None,
        }
    }

    /// Player or not.
    pub fn is_fish(&self) -> bool {
        self.as_fish().is_some()
    }

    /// Fish and snails change tiles on their own.
    pub fn is_mover(&self) -> bool {
        matches!(self.kind, EntityKind::Fish(_) | EntityKind::Snail(_))
    }

    /// Rocks and snails, which no one may swim onto.
    pub fn is_obstacle(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Rock | EntityKind::FallingRock | EntityKind::Snail(_)
        )
    }

    /// Hearts and bubbles.
    pub fn is_collectible(&self) -> bool {
        matches!(self.kind, EntityKind::Heart | EntityKind::Bubble)
    }

    /// The fish home.
    pub fn is_goal(&self) -> bool {
        matches!(self.kind, EntityKind::FishHome)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.kind.name(), self.id, self.position)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
