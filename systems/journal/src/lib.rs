#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game-rules journal that narrates the player's turns and tallies progress.

use delve_core::{Command, EntityId, EntityKind, Event, LadderDirection};
use log::info;

/// Message shown after picking up an item.
pub const ITEM_MESSAGE: &str = "You picked up an item.";
/// Message shown after picking up a collectable.
pub const COLLECTABLE_MESSAGE: &str = "You picked up a collectable.";
/// Message shown after opening a door.
pub const DOOR_MESSAGE: &str = "You opened the door.";
/// Message shown when the player climbs a ladder up.
pub const CLIMB_UP_MESSAGE: &str = "You climb up the ladder.";
/// Message shown when the player climbs a ladder down.
pub const CLIMB_DOWN_MESSAGE: &str = "You climb down the ladder.";

/// Configuration parameters required to construct the journal.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    item_goal: Option<u32>,
}

impl Config {
    /// Creates a configuration; `item_goal` is the number of items that
    /// completes the level.
    #[must_use]
    pub const fn new(item_goal: Option<u32>) -> Self {
        Self { item_goal }
    }
}

/// Counters accumulated while playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Dungeon level currently being played, starting at one at the top.
    pub level: u32,
    /// Completed moves of the player.
    pub moves: u32,
    /// Items picked up on the current level.
    pub items: u32,
    /// Collectables picked up on the current level.
    pub collectables: u32,
    /// Doors the player opened on the current level.
    pub doors_opened: u32,
}

/// Pure system that reacts to player events with log lines and pickup
/// confirmations.
#[derive(Debug)]
pub struct Journal {
    item_goal: Option<u32>,
    player: Option<EntityId>,
    pending_exit: Option<LadderDirection>,
    message: Option<String>,
    history: Vec<String>,
    stats: Stats,
}

impl Journal {
    /// Creates an empty journal using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            item_goal: config.item_goal,
            player: None,
            pending_exit: None,
            message: None,
            history: Vec::new(),
            stats: Stats::default(),
        }
    }

    /// Consumes world events and emits pickup confirmations.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match *event {
                Event::GridConfigured { .. } => {
                    self.player = None;
                    let level = match self.pending_exit.take() {
                        Some(LadderDirection::Up) => self.stats.level.saturating_sub(1).max(1),
                        Some(LadderDirection::Down) | None => self.stats.level.saturating_add(1),
                    };
                    self.stats = Stats {
                        level,
                        moves: self.stats.moves,
                        ..Stats::default()
                    };
                    let line = format!("Welcome to dungeon level {}.", self.stats.level);
                    self.record(line);
                }
                Event::EntitySpawned {
                    entity,
                    kind: EntityKind::Player,
                    ..
                } if self.player.is_none() => {
                    self.player = Some(entity);
                }
                Event::EntityDespawned { entity, .. } if self.is_player(entity) => {
                    self.player = None;
                }
                Event::MoveStarted { entity, .. } if self.is_player(entity) => {
                    self.message = None;
                }
                Event::MoveEnded { entity, .. } if self.is_player(entity) => {
                    self.stats.moves = self.stats.moves.saturating_add(1);
                }
                Event::PickupItem { entity, item } if self.is_player(entity) => {
                    self.stats.items = self.stats.items.saturating_add(1);
                    self.record(ITEM_MESSAGE.to_owned());
                    out.push(Command::MarkPickedUp { entity: item });
                }
                Event::PickupCollectable {
                    entity,
                    collectable,
                } if self.is_player(entity) => {
                    self.stats.collectables = self.stats.collectables.saturating_add(1);
                    self.record(COLLECTABLE_MESSAGE.to_owned());
                    out.push(Command::MarkPickedUp {
                        entity: collectable,
                    });
                }
                Event::DoorOpened { entity, .. } if self.is_player(entity) => {
                    self.stats.doors_opened = self.stats.doors_opened.saturating_add(1);
                    self.record(DOOR_MESSAGE.to_owned());
                }
                Event::LevelExited {
                    entity, direction, ..
                } if self.is_player(entity) => {
                    self.pending_exit = Some(direction);
                    let line = match direction {
                        LadderDirection::Up => CLIMB_UP_MESSAGE,
                        LadderDirection::Down => CLIMB_DOWN_MESSAGE,
                    };
                    self.record(line.to_owned());
                }
                _ => {}
            }
        }
    }

    /// Latest message, cleared whenever the player starts a move.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Every message recorded so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> Stats {
        self.stats
    }

    /// Player the journal follows on the current level.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Reports whether the configured item goal has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.item_goal
            .is_some_and(|goal| goal > 0 && self.stats.items >= goal)
    }

    fn is_player(&self, entity: EntityId) -> bool {
        self.player == Some(entity)
    }

    fn record(&mut self, line: String) {
        info!("{line}");
        self.history.push(line.clone());
        self.message = Some(line);
    }
}
