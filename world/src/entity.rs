//! Entities registered on the grid.

use delve_core::{
    world_position, CellCoord, DoorState, EntityId, EntityKind, EntitySnapshot, WorldPoint,
};

use crate::motion::{Easing, Motion};

/// Movable or static thing occupying a grid cell.
#[derive(Clone, Debug)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    cell: CellCoord,
    position: WorldPoint,
    motion: Option<Motion>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, kind: EntityKind, cell: CellCoord, aspect_ratio: f32) -> Self {
        Self {
            id,
            kind,
            cell,
            position: world_position(cell, aspect_ratio),
            motion: None,
        }
    }

    /// Identifier allocated to the entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Variant and payload of the entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Cell the entity currently reports as its position.
    ///
    /// While moving this follows the last cell crossed, not the occupancy
    /// layer, which holds no reference to the entity until the move commits.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Interpolated world-space position.
    #[must_use]
    pub const fn position(&self) -> WorldPoint {
        self.position
    }

    /// Whether the entity is in flight between two cells.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// Transition currently in progress, if any.
    #[must_use]
    pub const fn motion(&self) -> Option<&Motion> {
        self.motion.as_ref()
    }

    /// Captures an immutable snapshot for queries.
    #[must_use]
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            moving: self.is_moving(),
            position: self.position,
        }
    }

    pub(crate) fn easing(&self) -> Easing {
        if self.kind.steps_relative() {
            Easing::DoubleSmoothStep
        } else {
            Easing::SmoothStep
        }
    }

    pub(crate) fn begin(&mut self, motion: Motion) {
        self.motion = Some(motion);
    }

    pub(crate) fn motion_mut(&mut self) -> Option<&mut Motion> {
        self.motion.as_mut()
    }

    pub(crate) fn finish(&mut self) -> Option<Motion> {
        let motion = self.motion.take()?;
        self.cell = motion.destination();
        self.position = motion.end();
        Some(motion)
    }

    pub(crate) fn set_position(&mut self, position: WorldPoint) {
        self.position = position;
    }

    pub(crate) fn relocate(&mut self, cell: CellCoord, aspect_ratio: f32) {
        self.cell = cell;
        self.position = world_position(cell, aspect_ratio);
    }

    pub(crate) fn observe_cell(&mut self, cell: CellCoord) {
        self.cell = cell;
    }

    /// Marks an item or collectable as picked up. Returns `false` for other
    /// variants.
    pub(crate) fn mark_picked_up(&mut self) -> bool {
        match &mut self.kind {
            EntityKind::Item { picked_up } | EntityKind::Collectable { picked_up } => {
                *picked_up = true;
                true
            }
            _ => false,
        }
    }

    /// Overwrites a door's state. Returns `false` for other variants.
    pub(crate) fn set_door_state(&mut self, next: DoorState) -> bool {
        match &mut self.kind {
            EntityKind::Door { state } => {
                *state = next;
                true
            }
            _ => false,
        }
    }
}
