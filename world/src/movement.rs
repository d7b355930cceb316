//! Entity movement state machine: request resolution, interpolation, commit.

use std::time::Duration;

use delve_core::{CellCoord, DoorState, EntityId, EntityKind, Event};
use log::{debug, trace, warn};
use rand::Rng;

use crate::{
    grid::Grid,
    motion::{Motion, StepResult},
    observers::Emitter,
};

/// Starts a move for an idle entity or silently drops the request.
pub(crate) fn request_move<R: Rng>(
    grid: &mut Grid,
    rng: &mut R,
    entity: EntityId,
    target: CellCoord,
    duration: Duration,
    emitter: &mut Emitter<'_>,
) {
    let Some(mover) = grid.entity(entity) else {
        debug!("dropping move for unknown entity {}", entity.get());
        return;
    };
    if mover.is_moving() {
        debug!("dropping move for entity {}: already moving", entity.get());
        return;
    }

    let origin = mover.cell();
    if target == origin {
        return;
    }

    let destination = if mover.kind().steps_relative() {
        match resolve_step(grid, rng, origin, target) {
            Some(cell) => cell,
            None => {
                debug!(
                    "dropping move for entity {}: no walkable axis toward {:?}",
                    entity.get(),
                    target
                );
                return;
            }
        }
    } else {
        target
    };

    if let Some(door) = open_closed_door(grid, destination) {
        emitter.emit(Event::DoorOpened { entity, door });
        return;
    }

    if !can_enter(grid, entity, destination) {
        debug!(
            "dropping move for entity {}: {:?} cannot be entered",
            entity.get(),
            destination
        );
        return;
    }

    let aspect_ratio = grid.aspect_ratio();
    grid.release(origin, entity);
    grid.reserve(destination, entity);
    if let Some(mover) = grid.entity_mut(entity) {
        let motion = Motion::new(origin, destination, aspect_ratio, duration, mover.easing());
        mover.begin(motion);
    }
    emitter.emit(Event::MoveStarted {
        entity,
        from: origin,
        to: destination,
    });
}

/// Resolves a relative step against walkability, falling back to a single
/// axis when the direct destination is blocked.
fn resolve_step<R: Rng>(
    grid: &Grid,
    rng: &mut R,
    origin: CellCoord,
    target: CellCoord,
) -> Option<CellCoord> {
    let (mut dx, mut dy) = origin.delta_to(target);
    let walkable = |dx: i64, dy: i64| {
        origin
            .offset(dx, dy)
            .is_some_and(|cell| grid.is_walkable(cell))
    };

    if !walkable(dx, dy) {
        if !walkable(dx, 0) {
            dx = 0;
        }
        if !walkable(0, dy) {
            dy = 0;
        }
        if dx != 0 && dy != 0 {
            if rng.gen_bool(0.5) {
                dx = 0;
            } else {
                dy = 0;
            }
        }
    }

    if dx == 0 && dy == 0 {
        return None;
    }
    origin.offset(dx, dy)
}

/// Opens a closed door occupying the cell, returning its identifier.
fn open_closed_door(grid: &mut Grid, cell: CellCoord) -> Option<EntityId> {
    let door = grid.get_entity(cell)?;
    if door.kind()
        != (EntityKind::Door {
            state: DoorState::Closed,
        })
    {
        return None;
    }

    let id = door.id();
    let door = grid.entity_mut(id)?;
    let _ = door.set_door_state(DoorState::Open);
    Some(id)
}

/// Request-time admission: the cell must be walkable and not already
/// promised to another in-flight mover. Idle occupants other than obstacles
/// are left to the commit, so two entities may swap cells.
fn can_enter(grid: &Grid, entity: EntityId, cell: CellCoord) -> bool {
    grid.is_walkable(cell)
        && grid
            .reservation(cell)
            .map_or(true, |holder| holder == entity)
}

/// Advances every in-flight entity by `dt` in identifier order.
pub(crate) fn advance_all(grid: &mut Grid, dt: Duration, emitter: &mut Emitter<'_>) {
    for entity in grid.moving_entities() {
        advance(grid, entity, dt, emitter);
    }
}

fn advance(grid: &mut Grid, entity: EntityId, dt: Duration, emitter: &mut Emitter<'_>) {
    let Some(mover) = grid.entity_mut(entity) else {
        return;
    };
    let Some(motion) = mover.motion_mut() else {
        return;
    };

    let result = motion.advance(dt);
    let position = motion.position();
    mover.set_position(position);

    detect_crossing(grid, entity, emitter);

    if result == StepResult::Completed {
        commit(grid, entity, emitter);
    }
}

/// Fires cell-crossing notifications when the interpolated position resolves
/// to a cell other than the last one observed.
fn detect_crossing(grid: &mut Grid, entity: EntityId, emitter: &mut Emitter<'_>) {
    let Some(mover) = grid.entity(entity) else {
        return;
    };
    let Some(cell) = grid.cell_at(mover.position()) else {
        return;
    };
    let last_cell = match mover.motion() {
        Some(motion) => motion.last_cell(),
        None => return,
    };
    if cell == last_cell {
        return;
    }
    let is_player = mover.kind().steps_relative();

    if let Some(mover) = grid.entity_mut(entity) {
        mover.observe_cell(cell);
        if let Some(motion) = mover.motion_mut() {
            motion.observe_cell(cell);
        }
    }
    if is_player {
        grid.mark_visited(cell);
    }
    trace!("entity {} crossed into {:?}", entity.get(), cell);

    if let Some(occupant) = grid.get_entity(cell) {
        match occupant.kind() {
            EntityKind::Item { picked_up: false } => emitter.emit(Event::PickupItem {
                entity,
                item: occupant.id(),
            }),
            EntityKind::Collectable { picked_up: false } => {
                emitter.emit(Event::PickupCollectable {
                    entity,
                    collectable: occupant.id(),
                })
            }
            _ => {}
        }
    }

    emitter.emit(Event::MoveUpdated { entity, cell });
}

/// Snaps the entity onto its destination and claims the cell.
///
/// A destination still held by a blocking occupant sends the entity back to
/// its origin, or to the nearest free cell when the origin was taken in the
/// meantime.
fn commit(grid: &mut Grid, entity: EntityId, emitter: &mut Emitter<'_>) {
    let aspect_ratio = grid.aspect_ratio();
    let Some(motion) = grid.entity_mut(entity).and_then(|mover| mover.finish()) else {
        return;
    };
    let destination = motion.destination();
    grid.clear_reservation(destination, entity);

    let settled = match grid.claim(destination, entity) {
        Ok(()) => destination,
        Err(error) => {
            warn!("entity {} could not settle: {error}", entity.get());
            match settle_elsewhere(grid, entity, motion.origin()) {
                Some(cell) => {
                    if let Some(mover) = grid.entity_mut(entity) {
                        mover.relocate(cell, aspect_ratio);
                    }
                    cell
                }
                None => {
                    warn!(
                        "entity {} left unplaced at {:?}: no free cell",
                        entity.get(),
                        destination
                    );
                    destination
                }
            }
        }
    };

    emitter.emit(Event::MoveEnded {
        entity,
        cell: settled,
    });
    if settled == destination {
        announce_exit(grid, entity, settled, emitter);
    }
}

/// Claims the origin, or else the closest free walkable cell around it.
fn settle_elsewhere(grid: &mut Grid, entity: EntityId, origin: CellCoord) -> Option<CellCoord> {
    let (columns, rows) = grid.dimensions();
    let reach = i64::from(columns.max(rows));
    let mut candidates =
        std::iter::once(origin).chain((1..=reach).flat_map(|radius| ring(origin, radius)));
    candidates.find(|&cell| {
        grid.is_walkable(cell)
            && grid.reservation(cell).is_none()
            && grid.claim(cell, entity).is_ok()
    })
}

/// Cells exactly `radius` steps away from `center`, row by row.
fn ring(center: CellCoord, radius: i64) -> impl Iterator<Item = CellCoord> {
    (-radius..=radius)
        .flat_map(move |row_delta| {
            (-radius..=radius).map(move |column_delta| (column_delta, row_delta))
        })
        .filter(move |(column_delta, row_delta)| {
            column_delta.abs().max(row_delta.abs()) == radius
        })
        .filter_map(move |(column_delta, row_delta)| center.offset(column_delta, row_delta))
}

/// Fires `LevelExited` when a player settles on top of a ladder.
fn announce_exit(grid: &Grid, entity: EntityId, cell: CellCoord, emitter: &mut Emitter<'_>) {
    if !grid
        .entity(entity)
        .is_some_and(|mover| mover.kind().steps_relative())
    {
        return;
    }
    let Some(ladder) = grid.parked(cell).and_then(|id| grid.entity(id)) else {
        return;
    };
    if let EntityKind::Ladder { direction } = ladder.kind() {
        debug!("entity {} takes ladder {:?}", entity.get(), direction);
        emitter.emit(Event::LevelExited {
            entity,
            ladder: ladder.id(),
            direction,
        });
    }
}
