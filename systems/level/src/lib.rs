#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level loading: turns a textual layout into the commands that build a grid,
//! and stacks layouts into a dungeon joined by ladders.

mod dungeon;
mod layout;

use delve_core::{CellCoord, Command, Direction, EntityId, EntityKind, Event, LadderDirection};
use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use dungeon::{Dungeon, DungeonError};
pub use layout::{LayoutError, LevelLayout};

const PLACEMENT_ATTEMPTS: usize = 100;
const CLEARANCE: u32 = 1;

/// Configuration parameters required to construct the level loader.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    aspect_ratio: f32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration with the provided tile aspect ratio and seed
    /// for random placement of the player and ladders.
    #[must_use]
    pub const fn new(aspect_ratio: f32, rng_seed: u64) -> Self {
        Self {
            aspect_ratio,
            rng_seed,
        }
    }
}

/// Translates layouts into world command batches.
#[derive(Debug)]
pub struct Level {
    aspect_ratio: f32,
    rng: ChaCha8Rng,
}

impl Level {
    /// Creates a loader using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            aspect_ratio: config.aspect_ratio,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Builds the command batch that populates the grid with the layout.
    ///
    /// The batch configures the grid, places every tile, spawns the player,
    /// then spawns the remaining entities in row-major order. Without an `@`
    /// marker the player lands on a random free cell, preferring cells whose
    /// neighbours are free as well.
    pub fn commands(&mut self, layout: &LevelLayout) -> Vec<Command> {
        self.commands_with_ladders(layout, &[], None)
    }

    /// Builds the batch for a level that must offer the given ladders.
    ///
    /// Ladders missing from the layout are placed like the player, on random
    /// free cells with clear surroundings. A player arriving by `arrival`
    /// appears next to that ladder.
    pub(crate) fn commands_with_ladders(
        &mut self,
        layout: &LevelLayout,
        ladders: &[LadderDirection],
        arrival: Option<LadderDirection>,
    ) -> Vec<Command> {
        let (columns, rows) = layout.dimensions();
        let mut commands = vec![Command::ConfigureGrid {
            columns,
            rows,
            aspect_ratio: self.aspect_ratio,
        }];

        commands.extend(layout.cells().filter_map(|cell| {
            layout
                .tile(cell)
                .map(|kind| Command::PlaceTile { cell, kind })
        }));

        let mut taken = Vec::new();
        let mut placed_ladders = Vec::new();
        let mut ladder_cells = Vec::new();
        for &direction in ladders {
            let cell = layout.ladder(direction).or_else(|| {
                let cell = self.place(layout, &taken)?;
                taken.push(cell);
                placed_ladders.push(Command::SpawnEntity {
                    cell,
                    kind: EntityKind::Ladder { direction },
                });
                Some(cell)
            });
            match cell {
                Some(cell) => ladder_cells.push((direction, cell)),
                None => warn!("no free cell left for the {direction:?} ladder"),
            }
        }

        let beside_arrival = arrival.and_then(|direction| {
            let (_, ladder) = ladder_cells.iter().find(|(kind, _)| *kind == direction)?;
            beside(layout, &taken, *ladder)
        });
        match beside_arrival
            .or_else(|| layout.player())
            .or_else(|| self.place(layout, &taken))
        {
            Some(cell) => commands.push(Command::SpawnEntity {
                cell,
                kind: EntityKind::Player,
            }),
            None => warn!("no free cell left for the player"),
        }

        commands.extend(layout.cells().filter_map(|cell| {
            layout
                .entity(cell)
                .map(|kind| Command::SpawnEntity { cell, kind })
        }));
        commands.extend(placed_ladders);
        commands
    }

    fn place(&mut self, layout: &LevelLayout, taken: &[CellCoord]) -> Option<CellCoord> {
        (0..=CLEARANCE)
            .rev()
            .find_map(|radius| self.random_free_cell(layout, taken, radius))
    }

    /// Samples random cells until one is free along with every cell up to
    /// `radius` steps away in the eight compass directions.
    fn random_free_cell(
        &mut self,
        layout: &LevelLayout,
        taken: &[CellCoord],
        radius: u32,
    ) -> Option<CellCoord> {
        let (columns, rows) = layout.dimensions();
        if columns == 0 || rows == 0 {
            return None;
        }

        for _ in 0..PLACEMENT_ATTEMPTS {
            let cell = CellCoord::new(self.rng.gen_range(0..columns), self.rng.gen_range(0..rows));
            if has_clearance(layout, taken, cell, radius) {
                return Some(cell);
            }
        }
        debug!("no cell with clearance {radius} found in {PLACEMENT_ATTEMPTS} attempts");
        None
    }
}

fn is_free(layout: &LevelLayout, taken: &[CellCoord], cell: CellCoord) -> bool {
    layout.is_free(cell) && !taken.contains(&cell)
}

/// First free neighbour of `ladder`, clockwise from north.
fn beside(layout: &LevelLayout, taken: &[CellCoord], ladder: CellCoord) -> Option<CellCoord> {
    Direction::ALL
        .iter()
        .filter_map(|&direction| ladder.step(direction))
        .find(|&cell| is_free(layout, taken, cell))
}

fn has_clearance(layout: &LevelLayout, taken: &[CellCoord], cell: CellCoord, radius: u32) -> bool {
    if !is_free(layout, taken, cell) {
        return false;
    }
    (1..=i64::from(radius)).all(|distance| {
        Direction::ALL.iter().all(|direction| {
            let (column_delta, row_delta) = direction.delta();
            cell.offset(column_delta * distance, row_delta * distance)
                .is_some_and(|neighbour| is_free(layout, taken, neighbour))
        })
    })
}

/// Finds the player spawned by a level's command batch.
#[must_use]
pub fn spawned_player(events: &[Event]) -> Option<EntityId> {
    events.iter().find_map(|event| match event {
        Event::EntitySpawned {
            entity,
            kind: EntityKind::Player,
            ..
        } => Some(*entity),
        _ => None,
    })
}
