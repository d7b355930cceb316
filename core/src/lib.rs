#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Delve movement engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! that systems react to. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Vertical offset applied to entities so they stand on top of their tile.
pub const ENTITY_LIFT: f32 = 0.4;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Clears every grid layer and rebuilds the grid with new dimensions.
    ConfigureGrid {
        /// Number of cell columns in the grid.
        columns: u32,
        /// Number of cell rows in the grid.
        rows: u32,
        /// Ratio between tile height and tile width used for world positions.
        aspect_ratio: f32,
    },
    /// Places a static tile in the tile layer, replacing any previous tile.
    PlaceTile {
        /// Cell receiving the tile.
        cell: CellCoord,
        /// Terrain classification of the tile.
        kind: TileKind,
    },
    /// Registers a new entity in the entity layer.
    SpawnEntity {
        /// Cell the entity occupies once spawned.
        cell: CellCoord,
        /// Variant and payload of the entity.
        kind: EntityKind,
    },
    /// Removes an idle entity from play.
    DespawnEntity {
        /// Entity to remove.
        entity: EntityId,
    },
    /// Asks an entity to travel toward the target cell over the given duration.
    RequestMove {
        /// Entity that should move.
        entity: EntityId,
        /// Cell the entity should travel toward.
        target: CellCoord,
        /// Time the full transition takes.
        duration: Duration,
    },
    /// Advances every in-flight movement by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Flags an item or collectable as picked up.
    MarkPickedUp {
        /// Item or collectable that was picked up.
        entity: EntityId,
    },
    /// Overrides the state of a door. The world never closes doors on its own.
    SetDoorState {
        /// Door whose state should change.
        door: EntityId,
        /// Desired state.
        state: DoorState,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Confirms that the grid was reset with new dimensions.
    GridConfigured {
        /// Number of cell columns in the grid.
        columns: u32,
        /// Number of cell rows in the grid.
        rows: u32,
    },
    /// Indicates that the movement clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a tile was written into the tile layer.
    TilePlaced {
        /// Cell holding the tile.
        cell: CellCoord,
        /// Terrain classification of the tile.
        kind: TileKind,
    },
    /// Confirms that an entity joined the grid.
    EntitySpawned {
        /// Identifier allocated to the entity.
        entity: EntityId,
        /// Variant and payload of the entity.
        kind: EntityKind,
        /// Cell the entity occupies.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Cell provided in the spawn request.
        cell: CellCoord,
        /// Variant requested for the spawn.
        kind: EntityKind,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that an entity was removed from play.
    EntityDespawned {
        /// Entity that was removed.
        entity: EntityId,
        /// Cell the entity occupied before removal.
        cell: CellCoord,
    },
    /// An entity left its cell and began travelling.
    MoveStarted {
        /// Entity that is moving.
        entity: EntityId,
        /// Cell the entity vacated.
        from: CellCoord,
        /// Cell the entity travels toward.
        to: CellCoord,
    },
    /// A travelling entity crossed into a different cell.
    MoveUpdated {
        /// Entity that is moving.
        entity: EntityId,
        /// Cell the entity now reports as its position.
        cell: CellCoord,
    },
    /// A travelling entity settled and claimed its cell.
    MoveEnded {
        /// Entity that finished moving.
        entity: EntityId,
        /// Cell the entity claimed.
        cell: CellCoord,
    },
    /// A travelling entity crossed an item that has not been picked up.
    PickupItem {
        /// Entity that crossed the item.
        entity: EntityId,
        /// Item available for pickup.
        item: EntityId,
    },
    /// A travelling entity crossed a collectable that has not been picked up.
    PickupCollectable {
        /// Entity that crossed the collectable.
        entity: EntityId,
        /// Collectable available for pickup.
        collectable: EntityId,
    },
    /// A move request was spent opening a closed door.
    DoorOpened {
        /// Entity that opened the door.
        entity: EntityId,
        /// Door that transitioned to open.
        door: EntityId,
    },
    /// Confirms that an item or collectable was flagged as picked up.
    PickedUp {
        /// Item or collectable that was flagged.
        entity: EntityId,
    },
    /// Confirms an externally requested door state change.
    DoorStateChanged {
        /// Door whose state changed.
        door: EntityId,
        /// State after the change.
        state: DoorState,
    },
    /// A player settled on a ladder and leaves the current level.
    LevelExited {
        /// Player that took the ladder.
        entity: EntityId,
        /// Ladder the player settled on.
        ladder: EntityId,
        /// Way the ladder leads.
        direction: LadderDirection,
    },
}

impl Event {
    /// Entity the event is primarily about, if any.
    ///
    /// Movement, pickup and door-opening events report the acting entity.
    #[must_use]
    pub const fn subject(&self) -> Option<EntityId> {
        match self {
            Self::EntitySpawned { entity, .. }
            | Self::EntityDespawned { entity, .. }
            | Self::MoveStarted { entity, .. }
            | Self::MoveUpdated { entity, .. }
            | Self::MoveEnded { entity, .. }
            | Self::PickupItem { entity, .. }
            | Self::PickupCollectable { entity, .. }
            | Self::DoorOpened { entity, .. }
            | Self::LevelExited { entity, .. }
            | Self::PickedUp { entity } => Some(*entity),
            Self::DoorStateChanged { door, .. } => Some(*door),
            Self::GridConfigured { .. }
            | Self::TimeAdvanced { .. }
            | Self::TilePlaced { .. }
            | Self::SpawnRejected { .. } => None,
        }
    }
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The requested cell lies outside the configured grid.
    OutOfBounds,
    /// Another entity already occupies the requested cell.
    Occupied,
    /// An in-flight entity is travelling toward the requested cell.
    Reserved,
}

/// Unique identifier assigned to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Signed column and row difference required to reach `other`.
    #[must_use]
    pub fn delta_to(self, other: CellCoord) -> (i64, i64) {
        (
            i64::from(other.column) - i64::from(self.column),
            i64::from(other.row) - i64::from(self.row),
        )
    }

    /// Applies a signed offset, returning `None` when either axis leaves the
    /// non-negative coordinate space.
    #[must_use]
    pub fn offset(self, column_delta: i64, row_delta: i64) -> Option<CellCoord> {
        let column = u32::try_from(i64::from(self.column).checked_add(column_delta)?).ok()?;
        let row = u32::try_from(i64::from(self.row).checked_add(row_delta)?).ok()?;
        Some(Self::new(column, row))
    }

    /// Neighbouring cell in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (column_delta, row_delta) = direction.delta();
        self.offset(column_delta, row_delta)
    }
}

/// Eight-way swipe directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Diagonal toward decreasing rows and increasing columns.
    NorthEast,
    /// Movement toward increasing column indices.
    East,
    /// Diagonal toward increasing rows and increasing columns.
    SouthEast,
    /// Movement toward increasing row indices.
    South,
    /// Diagonal toward increasing rows and decreasing columns.
    SouthWest,
    /// Movement toward decreasing column indices.
    West,
    /// Diagonal toward decreasing rows and decreasing columns.
    NorthWest,
}

impl Direction {
    /// Every direction, clockwise from north.
    pub const ALL: [Direction; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Column and row increments applied by a single step.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// Reports whether the direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        let (column_delta, row_delta) = self.delta();
        column_delta != 0 && row_delta != 0
    }
}

/// Open or closed state of a door.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    /// The door blocks passage until it is opened.
    Closed,
    /// The door lets entities through.
    Open,
}

/// Way a ladder leads out of the current level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LadderDirection {
    /// Toward the shallower level.
    Up,
    /// Toward the deeper level.
    Down,
}

impl LadderDirection {
    /// Change in depth when the ladder is taken.
    #[must_use]
    pub const fn depth_delta(self) -> i64 {
        match self {
            Self::Up => -1,
            Self::Down => 1,
        }
    }

    /// Ladder that leads back the way this one came from.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// Kinds of static obstacles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Dungeon wall.
    Wall,
    /// Loose rock standing on a floor tile.
    Rock,
}

/// Closed set of entity variants together with their variant-specific state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Player-controlled entity that steps one cell at a time.
    Player,
    /// Entity that makes its cell unwalkable.
    Obstacle(ObstacleKind),
    /// Item that can be picked up.
    Item {
        /// Whether the item has already been picked up.
        picked_up: bool,
    },
    /// Collectable that can be picked up.
    Collectable {
        /// Whether the collectable has already been picked up.
        picked_up: bool,
    },
    /// Door gating passage into its cell.
    Door {
        /// Current state of the door.
        state: DoorState,
    },
    /// Ladder that takes a player settling on it to a neighbouring level.
    Ladder {
        /// Way the ladder leads.
        direction: LadderDirection,
    },
}

impl EntityKind {
    /// Reports whether the variant makes its cell unwalkable.
    #[must_use]
    pub const fn is_obstacle(&self) -> bool {
        matches!(self, Self::Obstacle(_))
    }

    /// Reports whether a mover may settle in the same cell as this entity.
    ///
    /// Items, collectables, ladders and open doors are passable; players,
    /// obstacles and closed doors are not.
    #[must_use]
    pub const fn is_passable(&self) -> bool {
        matches!(
            self,
            Self::Item { .. }
                | Self::Collectable { .. }
                | Self::Ladder { .. }
                | Self::Door {
                    state: DoorState::Open
                }
        )
    }

    /// Reports whether the variant resolves moves one relative step at a time.
    #[must_use]
    pub const fn steps_relative(&self) -> bool {
        matches!(self, Self::Player)
    }
}

/// Terrain classification of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Room or corridor floor.
    Floor,
    /// Tile beneath a wall obstacle.
    Wall,
    /// Floor tile that hosts a door.
    Doorway,
}

/// Continuous position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new world-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Linearly interpolates toward `other` by `t`.
    #[must_use]
    pub fn lerp(self, other: WorldPoint, t: f32) -> WorldPoint {
        WorldPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// World-space position at which an entity standing on `cell` is drawn.
#[must_use]
pub fn world_position(cell: CellCoord, aspect_ratio: f32) -> WorldPoint {
    WorldPoint::new(
        cell.column() as f32,
        ENTITY_LIFT + cell.row() as f32 * aspect_ratio,
    )
}

/// Resolves a world-space entity position to the nearest cell.
///
/// Returns `None` for points that round to negative coordinates or when the
/// aspect ratio cannot be inverted.
#[must_use]
pub fn cell_at(point: WorldPoint, aspect_ratio: f32) -> Option<CellCoord> {
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        return None;
    }

    let column = point.x.round();
    let row = ((point.y - ENTITY_LIFT) / aspect_ratio).round();
    if !column.is_finite() || !row.is_finite() || column < 0.0 || row < 0.0 {
        return None;
    }
    if column > u32::MAX as f32 || row > u32::MAX as f32 {
        return None;
    }

    Some(CellCoord::new(column as u32, row as u32))
}

/// Immutable representation of a single entity used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Identifier allocated to the entity.
    pub id: EntityId,
    /// Variant and payload of the entity.
    pub kind: EntityKind,
    /// Cell the entity currently reports as its position.
    pub cell: CellCoord,
    /// Whether the entity is in flight between two cells.
    pub moving: bool,
    /// Interpolated world-space position.
    pub position: WorldPoint,
}

/// Read-only snapshot describing all entities on the grid.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a tile used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSnapshot {
    /// Cell holding the tile.
    pub cell: CellCoord,
    /// Terrain classification of the tile.
    pub kind: TileKind,
    /// Whether a player has stood on the tile.
    pub visited: bool,
    /// Walkability derived from the entity layer when the snapshot was taken.
    pub walkable: bool,
}

#[cfg(test)]
mod tests {
    use super::{
        cell_at, world_position, CellCoord, Command, Direction, DoorState, EntityId, EntityKind,
        Event, LadderDirection, ObstacleKind, WorldPoint,
    };
    use std::time::Duration;

    #[test]
    fn offset_rejects_negative_coordinates() {
        let origin = CellCoord::new(0, 3);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(2, -3), Some(CellCoord::new(2, 0)));
    }

    #[test]
    fn step_follows_direction_delta() {
        let origin = CellCoord::new(2, 2);
        assert_eq!(origin.step(Direction::North), Some(CellCoord::new(2, 1)));
        assert_eq!(origin.step(Direction::SouthWest), Some(CellCoord::new(1, 3)));
        assert!(Direction::NorthEast.is_diagonal());
        assert!(!Direction::West.is_diagonal());
    }

    #[test]
    fn delta_to_is_signed() {
        let from = CellCoord::new(3, 1);
        assert_eq!(from.delta_to(CellCoord::new(1, 4)), (-2, 3));
    }

    #[test]
    fn world_position_resolves_back_to_cell() {
        for aspect_ratio in [0.5_f32, 0.75, 1.0] {
            for column in 0..6 {
                for row in 0..6 {
                    let cell = CellCoord::new(column, row);
                    let point = world_position(cell, aspect_ratio);
                    assert_eq!(cell_at(point, aspect_ratio), Some(cell));
                }
            }
        }
    }

    #[test]
    fn cell_at_rounds_to_nearest_cell() {
        let aspect_ratio = 1.0;
        assert_eq!(
            cell_at(WorldPoint::new(2.6, 0.4 + 1.2), aspect_ratio),
            Some(CellCoord::new(3, 1))
        );
        assert_eq!(cell_at(WorldPoint::new(-0.8, 0.4), aspect_ratio), None);
        assert_eq!(cell_at(WorldPoint::new(1.0, 1.0), 0.0), None);
    }

    #[test]
    fn passability_matches_variant() {
        assert!(EntityKind::Item { picked_up: false }.is_passable());
        assert!(EntityKind::Door {
            state: DoorState::Open
        }
        .is_passable());
        assert!(!EntityKind::Door {
            state: DoorState::Closed
        }
        .is_passable());
        assert!(!EntityKind::Player.is_passable());
        assert!(EntityKind::Ladder {
            direction: LadderDirection::Down
        }
        .is_passable());
        assert!(EntityKind::Obstacle(ObstacleKind::Rock).is_obstacle());
    }

    #[test]
    fn ladders_lead_between_depths() {
        assert_eq!(LadderDirection::Down.depth_delta(), 1);
        assert_eq!(LadderDirection::Up.depth_delta(), -1);
        assert_eq!(LadderDirection::Up.opposite(), LadderDirection::Down);
    }

    #[test]
    fn move_events_report_their_mover() {
        let entity = EntityId::new(7);
        let event = Event::DoorOpened {
            entity,
            door: EntityId::new(9),
        };
        assert_eq!(event.subject(), Some(entity));
        assert_eq!(
            Event::TimeAdvanced {
                dt: Duration::from_millis(16)
            }
            .subject(),
            None
        );
    }

    #[test]
    fn move_request_round_trips_through_bincode() {
        let command = Command::RequestMove {
            entity: EntityId::new(3),
            target: CellCoord::new(4, 1),
            duration: Duration::from_millis(300),
        };
        let bytes = bincode::serialize(&command).expect("serialize");
        let restored: Command = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, command);
    }
}
