//! The [`World`] is the spatial registry for the grid. It owns every placed
//! entity, remembers the order they were registered in, and decides which
//! tiles a mover may enter.
//!
//! Registry order matters: [`World::find`] reports occupants in insertion
//! order and [`World::can_swim`] lets the *first* occupant of a tile decide.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::entity::{
    Direction, Entity, EntityId, EntityKind, Fish, IdSequence, Position, Snail,
};
use crate::WorldError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// A `width x height` grid of tiles and the entities placed on it.
pub struct World {
    width: i32,
    height: i32,
    ids: IdSequence,
    /// Registered entities by id.
    entities: HashMap<EntityId, Entity>,
    /// Registered ids in insertion order.
    registry: Vec<EntityId>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("entity_count", &self.registry.len())
            .finish()
    }
}

impl World {
    /// Create an empty world.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidDimensions`] unless both sides are positive.
    pub fn new(width: i32, height: i32) -> Result<Self, WorldError> {
        if width <= 0 || height <= 0 {
            return Err(WorldError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            ids: IdSequence::new(),
            entities: HashMap::new(),
            registry: Vec::new(),
        })
    }

    /// Number of columns.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether `position` lies inside `[0, width) x [0, height)`.
    pub fn in_bounds(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // -- registry -----------------------------------------------------------

    /// Build an unregistered entity with a fresh id. Position it and pass it
    /// to [`register`](Self::register) to place it on the grid.
    pub fn create(&mut self, kind: EntityKind) -> Entity {
        Entity::new(self.ids.next_id(), kind)
    }

    /// Add an entity to the end of the registry.
    ///
    /// # Errors
    ///
    /// - [`WorldError::StaleEntity`] if the id was not issued by this world
    ///   or the entity was removed earlier.
    /// - [`WorldError::AlreadyRegistered`] if the id is already placed.
    /// - [`WorldError::OutOfBounds`] if the entity sits off the grid.
    pub fn register(&mut self, entity: Entity) -> Result<EntityId, WorldError> {
        let id = entity.id();
        if !self.ids.is_live(id) {
            return Err(WorldError::StaleEntity { entity: id });
        }
        if self.entities.contains_key(&id) {
            return Err(WorldError::AlreadyRegistered { entity: id });
        }
        if !self.in_bounds(entity.position()) {
            return Err(WorldError::OutOfBounds {
                position: entity.position(),
            });
        }
        tracing::debug!(entity = %id, kind = entity.kind().name(), position = %entity.position(), "register");
        self.registry.push(id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Take an entity off the grid and hand it back to the caller.
    ///
    /// The relative order of the remaining entities is preserved. Unknown or
    /// already-removed ids are a no-op returning `None`, so callers iterating
    /// a snapshot of ids may remove freely mid-scan.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.registry.retain(|&other| other != id);
        self.ids.retire(id);
        tracing::debug!(entity = %id, kind = entity.kind().name(), "remove");
        Some(entity)
    }

    /// Look up a registered entity. `None` once it has been removed.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Whether `id` is currently on the grid.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Registered entities in insertion order. Read-only.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.registry.iter().filter_map(|id| self.entities.get(id))
    }

    // -- spatial queries ----------------------------------------------------

    /// Registered entities on `position`, in insertion order.
    pub fn occupants(&self, position: Position) -> impl Iterator<Item = &Entity> + '_ {
        self.entities().filter(move |e| e.position() == position)
    }

    /// Ids of everything on `position`, in insertion order.
    pub fn find(&self, position: Position) -> Vec<EntityId> {
        self.occupants(position).map(Entity::id).collect()
    }

    /// Everything sharing a tile with `id`, excluding `id` itself. Empty if
    /// `id` is not registered.
    pub fn find_same_cell(&self, id: EntityId) -> Vec<EntityId> {
        match self.get(id) {
            Some(entity) => self
                .occupants(entity.position())
                .map(Entity::id)
                .filter(|&other| other != id)
                .collect(),
            None => Vec::new(),
        }
    }

    // -- placement ----------------------------------------------------------

    /// Pick a tile no registered entity occupies, uniformly at random.
    ///
    /// Free tiles are enumerated in row-major order so the draw is
    /// reproducible for a given RNG state.
    ///
    /// # Errors
    ///
    /// [`WorldError::WorldFull`] if every tile is taken.
    pub fn pick_unused_space<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Position, WorldError> {
        let occupied: HashSet<Position> = self.entities().map(Entity::position).collect();
        let free: Vec<Position> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Position::new(x, y)))
            .filter(|p| !occupied.contains(p))
            .collect();
        if free.is_empty() {
            return Err(WorldError::WorldFull {
                width: self.width,
                height: self.height,
            });
        }
        Ok(free[rng.gen_range(0..free.len())])
    }

    /// Create an entity of `kind` on a free tile and register it.
    pub fn insert_randomly<R: Rng + ?Sized>(
        &mut self,
        kind: EntityKind,
        rng: &mut R,
    ) -> Result<EntityId, WorldError> {
        let position = self.pick_unused_space(rng)?;
        let mut entity = self.create(kind);
        entity.set_position(position);
        let id = self.register(entity)?;
        self.check_find_myself(id)?;
        Ok(id)
    }

    /// Place a plain rock on a free tile.
    pub fn insert_rock_randomly<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EntityId, WorldError> {
        self.insert_randomly(EntityKind::Rock, rng)
    }

    /// Place a falling rock on a free tile. It blocks exactly like a rock.
    pub fn insert_falling_rock_randomly<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<EntityId, WorldError> {
        self.insert_randomly(EntityKind::FallingRock, rng)
    }

    /// Place a non-player fish of `color` on a free tile.
    pub fn insert_fish_randomly<R: Rng + ?Sized>(
        &mut self,
        color: u8,
        fast_scare: bool,
        rng: &mut R,
    ) -> Result<EntityId, WorldError> {
        self.insert_randomly(EntityKind::Fish(Fish::new(color, fast_scare)), rng)
    }

    /// Place the fish home. Sessions do this once, before anything else.
    pub fn insert_fish_home<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EntityId, WorldError> {
        self.insert_randomly(EntityKind::FishHome, rng)
    }

    /// Place a heart pickup on a free tile.
    pub fn insert_heart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EntityId, WorldError> {
        self.insert_randomly(EntityKind::Heart, rng)
    }

    /// Place a bubble pickup on a free tile.
    pub fn insert_bubble<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EntityId, WorldError> {
        self.insert_randomly(EntityKind::Bubble, rng)
    }

    /// Snails start out heading in a random direction.
    pub fn insert_snail_randomly<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EntityId, WorldError> {
        let heading = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
        self.insert_randomly(EntityKind::Snail(Snail { heading }), rng)
    }

    /// Verify that `find` at the entity's own tile reports it.
    fn check_find_myself(&self, id: EntityId) -> Result<(), WorldError> {
        let position = self
            .get(id)
            .map(Entity::position)
            .ok_or(WorldError::StaleEntity { entity: id })?;
        if self.find(position).contains(&id) {
            Ok(())
        } else {
            Err(WorldError::NotFoundAtPosition { entity: id, position })
        }
    }

    // -- movement -----------------------------------------------------------

    /// Whether `asker` may move onto `position`.
    ///
    /// Off-grid tiles are never legal. Otherwise the first occupant in
    /// registry order decides, regardless of what sits beneath it:
    ///
    /// | first occupant            | legal for                 |
    /// |---------------------------|---------------------------|
    /// | snail, rock, falling rock | nobody                    |
    /// | fish                      | the player                |
    /// | fish home, bubble, heart  | the player and any fish   |
    ///
    /// An empty tile is legal for everyone.
    pub fn can_swim(&self, asker: &Entity, position: Position) -> bool {
        if !self.in_bounds(position) {
            return false;
        }
        let Some(first) = self.occupants(position).next() else {
            return true;
        };
        match first.kind() {
            EntityKind::Snail(_) | EntityKind::Rock | EntityKind::FallingRock => false,
            EntityKind::Fish(_) => asker.is_player(),
            EntityKind::FishHome | EntityKind::Bubble | EntityKind::Heart => {
                asker.is_player() || asker.is_fish()
            }
        }
    }

    /// Place a registered entity on `position`, recording it in its history.
    /// No legality check is made.
    ///
    /// # Errors
    ///
    /// [`WorldError::OutOfBounds`] or [`WorldError::StaleEntity`].
    pub fn set_position(&mut self, id: EntityId, position: Position) -> Result<(), WorldError> {
        if !self.in_bounds(position) {
            return Err(WorldError::OutOfBounds { position });
        }
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::StaleEntity { entity: id })?;
        entity.set_position(position);
        Ok(())
    }

    /// Step a registered entity one tile in `direction` if
    /// [`can_swim`](Self::can_swim) allows it. Returns whether it moved.
    pub fn move_entity(&mut self, id: EntityId, direction: Direction) -> bool {
        let Some(entity) = self.get(id) else {
            return false;
        };
        let target = entity.position().offset(direction);
        if !self.can_swim(entity, target) {
            tracing::trace!(entity = %id, target = %target, "move blocked");
            return false;
        }
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_position(target);
        }
        true
    }

    /// Attempt one step in a uniformly random direction. A blocked attempt
    /// is dropped, not retried.
    pub fn move_randomly<R: Rng + ?Sized>(&mut self, id: EntityId, rng: &mut R) -> bool {
        let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
        self.move_entity(id, direction)
    }

    /// Drag `followers` along the leader's trail: follower `i` is placed
    /// where the leader stood `i + 1` updates ago. Followers for which the
    /// trail is not yet deep enough stay where they are.
    pub fn follow(&mut self, leader: EntityId, followers: &[EntityId]) {
        let Some(trail) = self
            .get(leader)
            .map(|l| l.history().iter().collect::<Vec<_>>())
        else {
            return;
        };
        for (i, follower) in followers.iter().enumerate() {
            let Some(&past) = trail.get(i + 1) else {
                break;
            };
            match self.entities.get_mut(follower) {
                Some(entity) => entity.set_position(past),
                None => tracing::warn!(entity = %follower, "follower is not registered, skipped"),
            }
        }
    }

    /// Run every registered entity's own per-tick behaviour. Only snails do
    /// anything: crawl along the heading, or turn clockwise if blocked.
    pub fn step_all(&mut self) {
        let ids = self.registry.clone();
        for id in ids {
            let heading = match self.get(id).map(Entity::kind) {
                Some(EntityKind::Snail(snail)) => snail.heading,
                _ => continue,
            };
            if self.move_entity(id, heading) {
                continue;
            }
            if let Some(EntityKind::Snail(snail)) = self.entities.get_mut(&id).map(Entity::kind_mut) {
                snail.heading = heading.turn_clockwise();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn place(world: &mut World, kind: EntityKind, x: i32, y: i32) -> EntityId {
        let mut entity = world.create(kind);
        entity.set_position(Position::new(x, y));
        world.register(entity).unwrap()
    }

    fn asker(world: &mut World, kind: EntityKind, player: bool) -> Entity {
        let mut entity = world.create(kind);
        if player {
            entity.mark_as_player();
        }
        entity
    }

    fn fish() -> EntityKind {
        EntityKind::Fish(Fish::new(2, false))
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(
            World::new(0, 5),
            Err(WorldError::InvalidDimensions { width: 0, height: 5 })
        ));
    }

    #[test]
    fn find_reports_insertion_order() {
        let mut world = World::new(4, 4).unwrap();
        let heart = place(&mut world, EntityKind::Heart, 1, 1);
        let _elsewhere = place(&mut world, EntityKind::Rock, 2, 1);
        let bubble = place(&mut world, EntityKind::Bubble, 1, 1);
        assert_eq!(world.find(Position::new(1, 1)), vec![heart, bubble]);
        assert_eq!(world.find_same_cell(heart), vec![bubble]);
        assert!(world.find(Position::new(3, 3)).is_empty());
    }

    #[test]
    fn register_rejects_duplicates_and_off_grid() {
        let mut world = World::new(3, 3).unwrap();
        let id = place(&mut world, EntityKind::Rock, 0, 0);
        let copy = world.get(id).unwrap().clone();
        assert!(matches!(
            world.register(copy),
            Err(WorldError::AlreadyRegistered { .. })
        ));

        let mut off = world.create(EntityKind::Rock);
        off.set_position(Position::new(3, 0));
        assert!(matches!(world.register(off), Err(WorldError::OutOfBounds { .. })));
    }

    #[test]
    fn remove_preserves_order_and_tolerates_repeats() {
        let mut world = World::new(3, 3).unwrap();
        let a = place(&mut world, EntityKind::Heart, 0, 0);
        let b = place(&mut world, EntityKind::Bubble, 0, 0);
        let c = place(&mut world, EntityKind::Heart, 0, 0);
        assert!(world.remove(b).is_some());
        assert!(world.remove(b).is_none());
        assert_eq!(world.find(Position::new(0, 0)), vec![a, c]);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn removed_entities_cannot_come_back() {
        let mut world = World::new(3, 3).unwrap();
        let fish_id = place(&mut world, fish(), 1, 1);
        let gone_home = world.remove(fish_id).unwrap();
        assert!(matches!(
            world.register(gone_home),
            Err(WorldError::StaleEntity { entity }) if entity == fish_id
        ));

        let mut stranger = Entity::new(EntityId::from_raw(40), EntityKind::Rock);
        stranger.set_position(Position::new(0, 0));
        assert!(matches!(
            world.register(stranger),
            Err(WorldError::StaleEntity { .. })
        ));
    }

    #[test]
    fn pick_unused_space_finds_the_last_hole() {
        let mut world = World::new(2, 2).unwrap();
        place(&mut world, EntityKind::Rock, 0, 0);
        place(&mut world, EntityKind::Rock, 1, 0);
        place(&mut world, EntityKind::Rock, 0, 1);
        let mut rng = Pcg64::seed_from_u64(7);
        assert_eq!(world.pick_unused_space(&mut rng).unwrap(), Position::new(1, 1));

        world.insert_heart(&mut rng).unwrap();
        assert!(matches!(
            world.pick_unused_space(&mut rng),
            Err(WorldError::WorldFull { width: 2, height: 2 })
        ));
    }

    #[test]
    fn can_swim_out_of_bounds_is_illegal() {
        let mut world = World::new(3, 3).unwrap();
        let player = asker(&mut world, fish(), true);
        for (x, y) in [(-1, 0), (0, -1), (3, 0), (0, 3)] {
            assert!(!world.can_swim(&player, Position::new(x, y)));
        }
        assert!(world.can_swim(&player, Position::new(2, 2)));
    }

    #[test]
    fn blockers_stop_everyone() {
        let mut world = World::new(3, 3).unwrap();
        place(&mut world, EntityKind::Rock, 0, 0);
        place(&mut world, EntityKind::FallingRock, 1, 0);
        place(&mut world, EntityKind::Snail(Snail::default()), 2, 0);
        let player = asker(&mut world, fish(), true);
        let other = asker(&mut world, fish(), false);
        let snail = asker(&mut world, EntityKind::Snail(Snail::default()), false);
        for x in 0..3 {
            let tile = Position::new(x, 0);
            assert!(!world.can_swim(&player, tile));
            assert!(!world.can_swim(&other, tile));
            assert!(!world.can_swim(&snail, tile));
        }
    }

    #[test]
    fn fish_tiles_admit_only_the_player() {
        let mut world = World::new(3, 3).unwrap();
        place(&mut world, fish(), 1, 1);
        let player = asker(&mut world, fish(), true);
        let other = asker(&mut world, fish(), false);
        assert!(world.can_swim(&player, Position::new(1, 1)));
        assert!(!world.can_swim(&other, Position::new(1, 1)));
    }

    #[test]
    fn pickups_and_home_admit_fish_but_not_snails() {
        let mut world = World::new(3, 3).unwrap();
        place(&mut world, EntityKind::FishHome, 0, 0);
        place(&mut world, EntityKind::Heart, 1, 0);
        place(&mut world, EntityKind::Bubble, 2, 0);
        let other = asker(&mut world, fish(), false);
        let snail = asker(&mut world, EntityKind::Snail(Snail::default()), false);
        for x in 0..3 {
            assert!(world.can_swim(&other, Position::new(x, 0)));
            assert!(!world.can_swim(&snail, Position::new(x, 0)));
        }
    }

    #[test]
    fn first_occupant_decides_mixed_tiles() {
        let mut world = World::new(3, 3).unwrap();
        place(&mut world, EntityKind::Heart, 0, 0);
        place(&mut world, EntityKind::Rock, 0, 0);
        place(&mut world, EntityKind::Rock, 1, 0);
        place(&mut world, EntityKind::Heart, 1, 0);
        let other = asker(&mut world, fish(), false);
        assert!(world.can_swim(&other, Position::new(0, 0)));
        assert!(!world.can_swim(&other, Position::new(1, 0)));
    }

    #[test]
    fn move_entity_respects_legality() {
        let mut world = World::new(3, 3).unwrap();
        let mover = place(&mut world, fish(), 0, 0);
        place(&mut world, EntityKind::Rock, 1, 0);
        assert!(!world.move_entity(mover, Direction::Right));
        assert!(!world.move_entity(mover, Direction::Up));
        assert!(world.move_entity(mover, Direction::Down));
        assert_eq!(world.get(mover).unwrap().position(), Position::new(0, 1));
    }

    #[test]
    fn follow_places_followers_on_the_trail() {
        let mut world = World::new(10, 10).unwrap();
        let mut leader = world.create(fish());
        leader.mark_as_player();
        for y in 2..=5 {
            leader.set_position(Position::new(5, y));
        }
        let leader = world.register(leader).unwrap();
        let a = place(&mut world, fish(), 0, 0);
        let b = place(&mut world, fish(), 1, 0);
        let c = place(&mut world, fish(), 2, 0);
        let d = place(&mut world, fish(), 3, 0);

        world.follow(leader, &[a, b, c, d]);

        assert_eq!(world.get(a).unwrap().position(), Position::new(5, 4));
        assert_eq!(world.get(b).unwrap().position(), Position::new(5, 3));
        assert_eq!(world.get(c).unwrap().position(), Position::new(5, 2));
        assert_eq!(world.get(d).unwrap().position(), Position::new(3, 0));
    }

    #[test]
    fn snail_crawls_then_turns_at_the_wall() {
        let mut world = World::new(3, 1).unwrap();
        let snail = place(&mut world, EntityKind::Snail(Snail { heading: Direction::Right }), 1, 0);
        world.step_all();
        assert_eq!(world.get(snail).unwrap().position(), Position::new(2, 0));
        world.step_all();
        assert_eq!(world.get(snail).unwrap().position(), Position::new(2, 0));
        assert_eq!(
            world.get(snail).unwrap().kind(),
            &EntityKind::Snail(Snail { heading: Direction::Down })
        );
    }

    #[test]
    fn snail_turns_instead_of_crawling_into_occupied_tiles() {
        let mut world = World::new(3, 3).unwrap();
        let snail = place(&mut world, EntityKind::Snail(Snail { heading: Direction::Right }), 0, 0);
        place(&mut world, EntityKind::Rock, 1, 0);
        place(&mut world, fish(), 0, 1);

        world.step_all();
        let shell = world.get(snail).unwrap();
        assert_eq!(shell.position(), Position::new(0, 0));
        assert_eq!(shell.kind(), &EntityKind::Snail(Snail { heading: Direction::Down }));

        // A plain fish below blocks it too.
        world.step_all();
        let shell = world.get(snail).unwrap();
        assert_eq!(shell.position(), Position::new(0, 0));
        assert_eq!(shell.kind(), &EntityKind::Snail(Snail { heading: Direction::Left }));

        // Left and up are walls, which swings it back round to the rock.
        world.step_all();
        world.step_all();
        assert_eq!(
            world.get(snail).unwrap().kind(),
            &EntityKind::Snail(Snail { heading: Direction::Right })
        );
        assert_eq!(world.get(snail).unwrap().position(), Position::new(0, 0));
    }

    #[test]
    fn snail_will_not_crawl_onto_pickups_or_home() {
        let mut world = World::new(4, 1).unwrap();
        let snail = place(&mut world, EntityKind::Snail(Snail { heading: Direction::Right }), 0, 0);
        place(&mut world, EntityKind::Heart, 1, 0);

        world.step_all();
        assert_eq!(world.get(snail).unwrap().position(), Position::new(0, 0));

        let mut homebound = World::new(4, 1).unwrap();
        let snail = place(&mut homebound, EntityKind::Snail(Snail { heading: Direction::Left }), 3, 0);
        place(&mut homebound, EntityKind::FishHome, 2, 0);
        homebound.step_all();
        assert_eq!(homebound.get(snail).unwrap().position(), Position::new(3, 0));
        assert_eq!(
            homebound.get(snail).unwrap().kind(),
            &EntityKind::Snail(Snail { heading: Direction::Up })
        );
    }
}
