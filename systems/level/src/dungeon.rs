//! Stack of levels joined by ladders.

use delve_core::{Command, EntityId, EntityKind, Event, LadderDirection};
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::{Config, Level, LevelLayout};

/// Errors raised while assembling a dungeon.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DungeonError {
    /// No layout was supplied.
    #[error("a dungeon needs at least one level")]
    NoLevels,
}

/// Pure system that swaps levels when the player takes a ladder.
///
/// Depth 0 is the top level. Each level draws its placement seed the first
/// time it is entered and reuses it on every return, so a revisited level is
/// rebuilt exactly as it was first laid out.
#[derive(Debug)]
pub struct Dungeon {
    aspect_ratio: f32,
    layouts: Vec<LevelLayout>,
    seeder: ChaCha8Rng,
    seeds: Vec<u64>,
    depth: usize,
    player: Option<EntityId>,
}

impl Dungeon {
    /// Creates a dungeon whose levels are the layouts, top first.
    pub fn new(config: Config, layouts: Vec<LevelLayout>) -> Result<Self, DungeonError> {
        if layouts.is_empty() {
            return Err(DungeonError::NoLevels);
        }
        Ok(Self {
            aspect_ratio: config.aspect_ratio,
            layouts,
            seeder: ChaCha8Rng::seed_from_u64(config.rng_seed),
            seeds: Vec::new(),
            depth: 0,
            player: None,
        })
    }

    /// Current depth, starting at 0 for the top level.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of levels in the dungeon.
    #[must_use]
    pub fn levels(&self) -> usize {
        self.layouts.len()
    }

    /// Placement seed of a level that has been entered at least once.
    #[must_use]
    pub fn seed(&self, depth: usize) -> Option<u64> {
        self.seeds.get(depth).copied()
    }

    /// Builds the top level.
    pub fn enter(&mut self) -> Vec<Command> {
        self.depth = 0;
        self.build(None)
    }

    /// Follows the player and rebuilds the grid when it takes a ladder.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match *event {
                Event::EntitySpawned {
                    entity,
                    kind: EntityKind::Player,
                    ..
                } => {
                    self.player = Some(entity);
                }
                Event::LevelExited {
                    entity, direction, ..
                } if self.player == Some(entity) => {
                    let Some(depth) = self.neighbour(direction) else {
                        warn!(
                            "{direction:?} ladder leads nowhere from depth {}",
                            self.depth
                        );
                        continue;
                    };
                    info!("player takes the {direction:?} ladder to depth {depth}");
                    self.depth = depth;
                    self.player = None;
                    out.extend(self.build(Some(direction.opposite())));
                    return;
                }
                _ => {}
            }
        }
    }

    fn neighbour(&self, direction: LadderDirection) -> Option<usize> {
        let depth = i64::try_from(self.depth)
            .ok()?
            .checked_add(direction.depth_delta())?;
        let depth = usize::try_from(depth).ok()?;
        (depth < self.layouts.len()).then_some(depth)
    }

    fn seed_for(&mut self, depth: usize) -> u64 {
        while self.seeds.len() <= depth {
            let seed = self.seeder.gen();
            self.seeds.push(seed);
        }
        self.seeds[depth]
    }

    /// Ladders the level at `depth` offers: up unless it is the top level,
    /// down unless it is the bottom one.
    fn ladders(&self, depth: usize) -> Vec<LadderDirection> {
        let mut ladders = Vec::with_capacity(2);
        if depth > 0 {
            ladders.push(LadderDirection::Up);
        }
        if depth + 1 < self.layouts.len() {
            ladders.push(LadderDirection::Down);
        }
        ladders
    }

    fn build(&mut self, arrival: Option<LadderDirection>) -> Vec<Command> {
        let depth = self.depth;
        let seed = self.seed_for(depth);
        let ladders = self.ladders(depth);
        let Some(layout) = self.layouts.get(depth) else {
            return Vec::new();
        };
        Level::new(Config::new(self.aspect_ratio, seed)).commands_with_ladders(
            layout,
            &ladders,
            arrival,
        )
    }
}
