#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid and movement state for Delve.

mod entity;
mod grid;
mod motion;
mod movement;
mod observers;

use delve_core::{CellCoord, Command, EntityId, EntityKind, Event, SpawnError};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use entity::Entity;
pub use grid::{Grid, OccupancyError, Tile};
pub use motion::{Easing, Motion, StepResult};
pub use observers::Observer;

use observers::{Emitter, Observers};

const DEFAULT_RNG_SEED: u64 = 0x5eed_d1e5_0f_d00d;
const DEFAULT_ASPECT_RATIO: f32 = 1.0;

/// Represents the authoritative Delve world state.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    rng: ChaCha8Rng,
    observers: Observers,
    next_entity: u32,
}

impl World {
    /// Creates an empty world seeded with the default axis-fallback seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_RNG_SEED)
    }

    /// Creates an empty world whose axis-fallback choices derive from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            grid: Grid::new(0, 0, DEFAULT_ASPECT_RATIO),
            rng: ChaCha8Rng::seed_from_u64(seed),
            observers: Observers::default(),
            next_entity: 0,
        }
    }

    /// Registers an observer for events about `entity`.
    ///
    /// Observers fire synchronously, in registration order, before the event
    /// is appended to the output buffer. They are dropped when the entity is
    /// despawned or the grid is reconfigured.
    pub fn subscribe<F>(&mut self, entity: EntityId, observer: F)
    where
        F: FnMut(&Event) + 'static,
    {
        self.observers.subscribe(entity, Box::new(observer));
    }

    /// Registers an observer for every event the world emits.
    pub fn subscribe_all<F>(&mut self, observer: F)
    where
        F: FnMut(&Event) + 'static,
    {
        self.observers.subscribe_all(Box::new(observer));
    }

    fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid {
            columns,
            rows,
            aspect_ratio,
        } => {
            let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
                aspect_ratio
            } else {
                debug!("replacing invalid aspect ratio {aspect_ratio} with {DEFAULT_ASPECT_RATIO}");
                DEFAULT_ASPECT_RATIO
            };
            world.grid.initialize(columns, rows, aspect_ratio);
            world.observers.forget_entities();
            Emitter::new(&mut world.observers, out_events)
                .emit(Event::GridConfigured { columns, rows });
        }
        Command::PlaceTile { cell, kind } => {
            if world.grid.place_tile(cell, kind) {
                Emitter::new(&mut world.observers, out_events)
                    .emit(Event::TilePlaced { cell, kind });
            } else {
                debug!("ignoring tile outside the grid at {cell:?}");
            }
        }
        Command::SpawnEntity { cell, kind } => spawn(world, cell, kind, out_events),
        Command::DespawnEntity { entity } => despawn(world, entity, out_events),
        Command::RequestMove {
            entity,
            target,
            duration,
        } => {
            let mut emitter = Emitter::new(&mut world.observers, out_events);
            movement::request_move(
                &mut world.grid,
                &mut world.rng,
                entity,
                target,
                duration,
                &mut emitter,
            );
        }
        Command::Tick { dt } => {
            let mut emitter = Emitter::new(&mut world.observers, out_events);
            emitter.emit(Event::TimeAdvanced { dt });
            movement::advance_all(&mut world.grid, dt, &mut emitter);
        }
        Command::MarkPickedUp { entity } => {
            let flagged = world
                .grid
                .entity_mut(entity)
                .is_some_and(|target| target.mark_picked_up());
            if flagged {
                Emitter::new(&mut world.observers, out_events).emit(Event::PickedUp { entity });
            }
        }
        Command::SetDoorState { door, state } => {
            let changed = world
                .grid
                .entity_mut(door)
                .is_some_and(|target| target.set_door_state(state));
            if changed {
                Emitter::new(&mut world.observers, out_events)
                    .emit(Event::DoorStateChanged { door, state });
            }
        }
    }
}

fn spawn(world: &mut World, cell: CellCoord, kind: EntityKind, out_events: &mut Vec<Event>) {
    let rejection = if !world.grid.contains(cell) {
        Some(SpawnError::OutOfBounds)
    } else if world.grid.occupant(cell).is_some() {
        Some(SpawnError::Occupied)
    } else if world.grid.reservation(cell).is_some() {
        Some(SpawnError::Reserved)
    } else {
        None
    };
    if let Some(reason) = rejection {
        Emitter::new(&mut world.observers, out_events)
            .emit(Event::SpawnRejected { cell, kind, reason });
        return;
    }

    let id = world.allocate_entity();
    let aspect_ratio = world.grid.aspect_ratio();
    world
        .grid
        .insert_entity(Entity::new(id, kind, cell, aspect_ratio));
    world.grid.set_entity(cell, Some(id));
    if kind.steps_relative() {
        world.grid.mark_visited(cell);
    }
    Emitter::new(&mut world.observers, out_events).emit(Event::EntitySpawned {
        entity: id,
        kind,
        cell,
    });
}

fn despawn(world: &mut World, entity: EntityId, out_events: &mut Vec<Event>) {
    let Some(target) = world.grid.entity(entity) else {
        return;
    };
    if target.is_moving() {
        debug!("refusing to despawn entity {} while it moves", entity.get());
        return;
    }

    let cell = target.cell();
    world.grid.release(cell, entity);
    let _ = world.grid.remove_entity(entity);
    Emitter::new(&mut world.observers, out_events)
        .emit(Event::EntityDespawned { entity, cell });
    world.observers.forget(entity);
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use delve_core::{CellCoord, EntityId, EntitySnapshot, EntityView, TileSnapshot};

    use super::{Grid, World};

    /// Provides read-only access to the layered grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Captures the tile at the cell, including its current walkability.
    #[must_use]
    pub fn tile(world: &World, cell: CellCoord) -> Option<TileSnapshot> {
        world.grid.get_tile(cell).map(|tile| tile.snapshot())
    }

    /// Reports whether the cell holds a tile and no obstacle.
    #[must_use]
    pub fn is_walkable(world: &World, cell: CellCoord) -> bool {
        world.grid.is_walkable(cell)
    }

    /// Captures the entity registered in the entity layer at the cell.
    #[must_use]
    pub fn entity_at(world: &World, cell: CellCoord) -> Option<EntitySnapshot> {
        world.grid.get_entity(cell).map(|entity| entity.snapshot())
    }

    /// Captures the entity with the provided identifier.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.grid.entity(id).map(|entity| entity.snapshot())
    }

    /// Captures a read-only view of every entity in the world.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        EntityView::from_snapshots(world.grid.entities().map(|entity| entity.snapshot()).collect())
    }

    /// Lists every cell whose entity layer holds a reference.
    #[must_use]
    pub fn occupied_cells(world: &World) -> Vec<(CellCoord, EntityId)> {
        world.grid.occupied_cells().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use super::*;
    use delve_core::{DoorState, ObstacleKind, TileKind};

    fn floor_world(columns: u32, rows: u32) -> (World, Vec<Event>) {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureGrid {
                columns,
                rows,
                aspect_ratio: 1.0,
            },
            &mut events,
        );
        for row in 0..rows {
            for column in 0..columns {
                apply(
                    &mut world,
                    Command::PlaceTile {
                        cell: CellCoord::new(column, row),
                        kind: TileKind::Floor,
                    },
                    &mut events,
                );
            }
        }
        (world, events)
    }

    fn spawn_at(world: &mut World, cell: CellCoord, kind: EntityKind) -> EntityId {
        let mut events = Vec::new();
        apply(world, Command::SpawnEntity { cell, kind }, &mut events);
        match events.as_slice() {
            [Event::EntitySpawned { entity, .. }] => *entity,
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    #[test]
    fn configure_grid_emits_confirmation() {
        let (world, events) = floor_world(4, 3);
        assert_eq!(events[0], Event::GridConfigured { columns: 4, rows: 3 });
        assert_eq!(query::grid(&world).dimensions(), (4, 3));
    }

    #[test]
    fn invalid_aspect_ratio_falls_back_to_square_tiles() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureGrid {
                columns: 2,
                rows: 2,
                aspect_ratio: f32::NAN,
            },
            &mut events,
        );
        assert_eq!(query::grid(&world).aspect_ratio(), DEFAULT_ASPECT_RATIO);
    }

    #[test]
    fn spawn_rejects_occupied_and_out_of_bounds_cells() {
        let (mut world, _) = floor_world(2, 2);
        let cell = CellCoord::new(0, 0);
        let _ = spawn_at(&mut world, cell, EntityKind::Player);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEntity {
                cell,
                kind: EntityKind::Obstacle(ObstacleKind::Rock),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnEntity {
                cell: CellCoord::new(2, 0),
                kind: EntityKind::Player,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::SpawnRejected {
                    cell,
                    kind: EntityKind::Obstacle(ObstacleKind::Rock),
                    reason: SpawnError::Occupied,
                },
                Event::SpawnRejected {
                    cell: CellCoord::new(2, 0),
                    kind: EntityKind::Player,
                    reason: SpawnError::OutOfBounds,
                },
            ]
        );
    }

    #[test]
    fn spawned_player_marks_tile_visited() {
        let (mut world, _) = floor_world(2, 2);
        let cell = CellCoord::new(1, 1);
        let _ = spawn_at(&mut world, cell, EntityKind::Player);
        assert!(query::tile(&world, cell).expect("tile").visited);
        assert!(!query::tile(&world, CellCoord::new(0, 0)).expect("tile").visited);
    }

    #[test]
    fn spawn_rejects_reserved_destination() {
        let (mut world, _) = floor_world(3, 1);
        let player = spawn_at(&mut world, CellCoord::new(0, 0), EntityKind::Player);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RequestMove {
                entity: player,
                target: CellCoord::new(1, 0),
                duration: Duration::from_millis(200),
            },
            &mut events,
        );

        events.clear();
        apply(
            &mut world,
            Command::SpawnEntity {
                cell: CellCoord::new(1, 0),
                kind: EntityKind::Obstacle(ObstacleKind::Rock),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::SpawnRejected {
                reason: SpawnError::Reserved,
                ..
            }]
        ));
    }

    #[test]
    fn despawn_restores_parked_occupant_and_drops_observers() {
        let (mut world, _) = floor_world(2, 1);
        let cell = CellCoord::new(1, 0);
        let door = spawn_at(
            &mut world,
            cell,
            EntityKind::Door {
                state: DoorState::Open,
            },
        );
        let player = spawn_at(&mut world, CellCoord::new(0, 0), EntityKind::Player);

        let seen = Rc::new(RefCell::new(0_usize));
        let counter = Rc::clone(&seen);
        world.subscribe(player, move |_| *counter.borrow_mut() += 1);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RequestMove {
                entity: player,
                target: cell,
                duration: Duration::ZERO,
            },
            &mut events,
        );
        apply(&mut world, Command::Tick { dt: Duration::ZERO }, &mut events);
        assert_eq!(query::grid(&world).occupant(cell), Some(player));
        assert_eq!(query::grid(&world).parked(cell), Some(door));

        apply(&mut world, Command::DespawnEntity { entity: player }, &mut events);
        assert_eq!(query::grid(&world).occupant(cell), Some(door));
        assert!(query::entity(&world, player).is_none());

        let before = *seen.borrow();
        apply(
            &mut world,
            Command::SpawnEntity {
                cell: CellCoord::new(0, 0),
                kind: EntityKind::Player,
            },
            &mut events,
        );
        assert_eq!(*seen.borrow(), before);
    }

    #[test]
    fn mark_picked_up_only_applies_to_pickups() {
        let (mut world, _) = floor_world(2, 1);
        let item = spawn_at(
            &mut world,
            CellCoord::new(0, 0),
            EntityKind::Item { picked_up: false },
        );
        let rock = spawn_at(
            &mut world,
            CellCoord::new(1, 0),
            EntityKind::Obstacle(ObstacleKind::Rock),
        );

        let mut events = Vec::new();
        apply(&mut world, Command::MarkPickedUp { entity: item }, &mut events);
        apply(&mut world, Command::MarkPickedUp { entity: rock }, &mut events);

        assert_eq!(events, vec![Event::PickedUp { entity: item }]);
        assert_eq!(
            query::entity(&world, item).map(|snapshot| snapshot.kind),
            Some(EntityKind::Item { picked_up: true })
        );
    }

    #[test]
    fn reconfigure_discards_previous_level() {
        let (mut world, _) = floor_world(3, 3);
        let _ = spawn_at(&mut world, CellCoord::new(1, 1), EntityKind::Player);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureGrid {
                columns: 3,
                rows: 3,
                aspect_ratio: 1.0,
            },
            &mut events,
        );

        assert!(query::entity_view(&world).into_vec().is_empty());
        assert!(query::occupied_cells(&world).is_empty());
        assert!(query::tile(&world, CellCoord::new(1, 1)).is_none());
    }
}
