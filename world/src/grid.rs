//! Layered cell storage: tiles, occupants, parked occupants and reservations.

use std::collections::BTreeMap;

use delve_core::{cell_at, CellCoord, EntityId, TileKind, TileSnapshot, WorldPoint};
use thiserror::Error;

use crate::entity::Entity;

/// Reasons an entity could not claim a cell.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum OccupancyError {
    /// The cell lies outside the grid.
    #[error("cell {0:?} lies outside the grid")]
    OutOfBounds(CellCoord),
    /// Another entity already holds the cell and cannot be parked beneath.
    #[error("cell {cell:?} is held by entity {occupant:?}")]
    Occupied {
        /// Cell that was requested.
        cell: CellCoord,
        /// Entity currently holding the cell.
        occupant: EntityId,
    },
}

#[derive(Clone, Copy, Debug)]
struct TileState {
    kind: TileKind,
    visited: bool,
}

/// Static tile borrowed from the grid.
///
/// Walkability is read from the entity layer on every call so it always
/// reflects the current occupant.
#[derive(Clone, Copy, Debug)]
pub struct Tile<'a> {
    grid: &'a Grid,
    cell: CellCoord,
    state: TileState,
}

impl Tile<'_> {
    /// Cell holding the tile.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Terrain classification of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.state.kind
    }

    /// Whether a player has stood on the tile.
    #[must_use]
    pub const fn visited(&self) -> bool {
        self.state.visited
    }

    /// Reports whether the cell is free of obstacles.
    #[must_use]
    pub fn is_walkable(&self) -> bool {
        self.grid
            .get_entity(self.cell)
            .map_or(true, |entity| !entity.kind().is_obstacle())
    }

    /// Captures an immutable snapshot for queries.
    #[must_use]
    pub fn snapshot(&self) -> TileSnapshot {
        TileSnapshot {
            cell: self.cell,
            kind: self.state.kind,
            visited: self.state.visited,
            walkable: self.is_walkable(),
        }
    }
}

/// Two-dimensional layered lookup from cell to tile and to entity.
///
/// The entity layer holds at most one occupant per cell. Passable occupants
/// displaced by a settling mover are parked in the underlay layer and restored
/// once the mover leaves. Reservations mark the destinations of in-flight
/// movers; they never show up through [`Grid::get_entity`].
#[derive(Debug)]
pub struct Grid {
    columns: u32,
    rows: u32,
    aspect_ratio: f32,
    tiles: Vec<Option<TileState>>,
    occupants: Vec<Option<EntityId>>,
    underlay: Vec<Option<EntityId>>,
    reserved: Vec<Option<EntityId>>,
    entities: BTreeMap<EntityId, Entity>,
}

impl Grid {
    pub(crate) fn new(columns: u32, rows: u32, aspect_ratio: f32) -> Self {
        let mut grid = Self {
            columns: 0,
            rows: 0,
            aspect_ratio,
            tiles: Vec::new(),
            occupants: Vec::new(),
            underlay: Vec::new(),
            reserved: Vec::new(),
            entities: BTreeMap::new(),
        };
        grid.initialize(columns, rows, aspect_ratio);
        grid
    }

    /// Resets every layer to empty, replacing prior level state.
    pub(crate) fn initialize(&mut self, columns: u32, rows: u32, aspect_ratio: f32) {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        self.columns = columns;
        self.rows = rows;
        self.aspect_ratio = aspect_ratio;
        self.tiles = vec![None; capacity];
        self.occupants = vec![None; capacity];
        self.underlay = vec![None; capacity];
        self.reserved = vec![None; capacity];
        self.entities.clear();
    }

    /// Provides the dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Ratio between tile height and tile width.
    #[must_use]
    pub const fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Resolves a world-space position to a cell inside the grid.
    #[must_use]
    pub fn cell_at(&self, point: WorldPoint) -> Option<CellCoord> {
        cell_at(point, self.aspect_ratio).filter(|cell| self.contains(*cell))
    }

    /// Returns the tile at the cell; `None` when out of bounds or void.
    #[must_use]
    pub fn get_tile(&self, cell: CellCoord) -> Option<Tile<'_>> {
        let index = self.index(cell)?;
        let state = self.tiles.get(index).copied().flatten()?;
        Some(Tile {
            grid: self,
            cell,
            state,
        })
    }

    /// Returns the tile nearest to a world-space position.
    #[must_use]
    pub fn get_tile_at(&self, point: WorldPoint) -> Option<Tile<'_>> {
        self.get_tile(self.cell_at(point)?)
    }

    /// Returns the occupant of the cell; `None` when empty or out of bounds.
    #[must_use]
    pub fn get_entity(&self, cell: CellCoord) -> Option<&Entity> {
        let id = self.occupant(cell)?;
        self.entities.get(&id)
    }

    /// Returns the occupant of the cell nearest to a world-space position.
    #[must_use]
    pub fn get_entity_at(&self, point: WorldPoint) -> Option<&Entity> {
        self.get_entity(self.cell_at(point)?)
    }

    /// Reports whether a tile exists at the cell and holds no obstacle.
    ///
    /// Void and out-of-bounds cells are never walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.get_tile(cell).is_some_and(|tile| tile.is_walkable())
    }

    /// Identifier registered in the entity layer for the cell.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<EntityId> {
        self.index(cell)
            .and_then(|index| self.occupants.get(index).copied().flatten())
    }

    /// Identifier parked beneath the occupant of the cell.
    #[must_use]
    pub fn parked(&self, cell: CellCoord) -> Option<EntityId> {
        self.index(cell)
            .and_then(|index| self.underlay.get(index).copied().flatten())
    }

    /// In-flight entity travelling toward the cell, if any.
    #[must_use]
    pub fn reservation(&self, cell: CellCoord) -> Option<EntityId> {
        self.index(cell)
            .and_then(|index| self.reserved.get(index).copied().flatten())
    }

    /// Looks up an entity by identifier.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Iterator over every registered entity in identifier order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Cells whose entity layer holds a reference, in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellCoord, EntityId)> + '_ {
        let columns = self.columns;
        self.occupants
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                let id = (*slot)?;
                let index = u32::try_from(index).ok()?;
                Some((CellCoord::new(index % columns, index / columns), id))
            })
    }

    /// Unconditionally writes the entity layer. Performs no collision checks.
    pub(crate) fn set_entity(&mut self, cell: CellCoord, entity: Option<EntityId>) {
        if let Some(index) = self.index(cell) {
            self.occupants[index] = entity;
        }
    }

    /// Claims a cell for `id`, parking a passable occupant in the underlay.
    pub(crate) fn claim(&mut self, cell: CellCoord, id: EntityId) -> Result<(), OccupancyError> {
        let index = self.index(cell).ok_or(OccupancyError::OutOfBounds(cell))?;
        match self.occupants[index] {
            None => {
                self.set_entity(cell, Some(id));
                Ok(())
            }
            Some(current) if current == id => Ok(()),
            Some(current) => {
                let passable = self
                    .entities
                    .get(&current)
                    .map_or(true, |entity| entity.kind().is_passable());
                if passable && self.underlay[index].is_none() {
                    self.underlay[index] = Some(current);
                    self.set_entity(cell, Some(id));
                    Ok(())
                } else {
                    Err(OccupancyError::Occupied {
                        cell,
                        occupant: current,
                    })
                }
            }
        }
    }

    /// Clears `id` from the cell, restoring any parked occupant.
    pub(crate) fn release(&mut self, cell: CellCoord, id: EntityId) {
        let Some(index) = self.index(cell) else {
            return;
        };
        if self.occupants[index] == Some(id) {
            let parked = self.underlay[index].take();
            self.set_entity(cell, parked);
        } else if self.underlay[index] == Some(id) {
            self.underlay[index] = None;
        }
    }

    pub(crate) fn reserve(&mut self, cell: CellCoord, id: EntityId) {
        if let Some(index) = self.index(cell) {
            self.reserved[index] = Some(id);
        }
    }

    pub(crate) fn clear_reservation(&mut self, cell: CellCoord, id: EntityId) {
        if let Some(index) = self.index(cell) {
            if self.reserved[index] == Some(id) {
                self.reserved[index] = None;
            }
        }
    }

    pub(crate) fn place_tile(&mut self, cell: CellCoord, kind: TileKind) -> bool {
        match self.index(cell) {
            Some(index) => {
                self.tiles[index] = Some(TileState {
                    kind,
                    visited: false,
                });
                true
            }
            None => false,
        }
    }

    pub(crate) fn mark_visited(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(Some(tile)) = self.tiles.get_mut(index) {
                tile.visited = true;
            }
        }
    }

    pub(crate) fn insert_entity(&mut self, entity: Entity) {
        let _ = self.entities.insert(entity.id(), entity);
    }

    pub(crate) fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub(crate) fn moving_entities(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| entity.is_moving())
            .map(Entity::id)
            .collect()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
