//! Fixed-step driver that wires the world to the swipe buffer and journal.

use anyhow::{bail, Context, Result};
use delve_core::{
    CellCoord, Command, Direction, DoorState, EntityKind, Event, LadderDirection, ObstacleKind,
};
use delve_system_journal::{self as journal, Journal, Stats};
use delve_system_level::{self as level, spawned_player, Dungeon, LevelLayout};
use delve_system_swipe::SwipeBuffer;
use delve_world::{self as world, query, World};
use log::{debug, info, warn};

use crate::config::Settings;

/// Outcome of a scripted run.
#[derive(Debug)]
pub(crate) struct Report {
    pub(crate) history: Vec<String>,
    pub(crate) stats: Stats,
    pub(crate) depth: usize,
    pub(crate) position: CellCoord,
    pub(crate) ticks: u32,
    pub(crate) complete: bool,
    pub(crate) map: String,
}

/// Pure systems driven alongside the world.
struct Systems {
    swipe: SwipeBuffer,
    journal: Journal,
    dungeon: Dungeon,
}

/// Enters the top level, feeds every swipe, and ticks until the queue drains.
pub(crate) fn run(
    layouts: Vec<LevelLayout>,
    directions: &[Direction],
    settings: &Settings,
) -> Result<Report> {
    let mut world = World::with_seed(settings.seed);
    world.subscribe_all(|event| debug!("event {event:?}"));

    let mut journal = Journal::new(journal::Config::new(settings.item_goal));
    let mut dungeon = Dungeon::new(
        level::Config::new(settings.aspect_ratio, settings.seed),
        layouts,
    )?;

    let mut events = Vec::new();
    for command in dungeon.enter() {
        world::apply(&mut world, command, &mut events);
    }
    for event in &events {
        if let Event::SpawnRejected { cell, kind, reason } = event {
            warn!("level entity {kind:?} at {cell:?} rejected: {reason:?}");
        }
    }
    let player = spawned_player(&events).context("layout leaves no room for the player")?;
    info!("player {} enters the level", player.get());

    let mut follow_up = Vec::new();
    journal.handle(&events, &mut follow_up);
    dungeon.handle(&events, &mut follow_up);
    events.clear();
    for command in follow_up {
        world::apply(&mut world, command, &mut events);
    }

    let mut swipe = SwipeBuffer::new(player, settings.step_duration());
    for &direction in directions {
        let _ = swipe.push(direction);
    }

    let mut systems = Systems {
        swipe,
        journal,
        dungeon,
    };
    pump(&mut world, &mut systems, &mut events);

    let mut ticks = 0_u32;
    while systems.swipe.is_busy() || !systems.swipe.is_empty() {
        if ticks >= settings.max_ticks {
            bail!("swipes still pending after {ticks} ticks");
        }
        world::apply(
            &mut world,
            Command::Tick {
                dt: settings.tick(),
            },
            &mut events,
        );
        ticks += 1;
        pump(&mut world, &mut systems, &mut events);
    }

    let position = query::entity(&world, systems.swipe.entity())
        .map(|snapshot| snapshot.cell)
        .context("player vanished during the run")?;

    Ok(Report {
        history: systems.journal.history().to_vec(),
        stats: systems.journal.stats(),
        depth: systems.dungeon.depth(),
        position,
        ticks,
        complete: systems.journal.is_complete(),
        map: render(&world),
    })
}

/// Routes pending events through the systems until no commands remain.
fn pump(world: &mut World, systems: &mut Systems, events: &mut Vec<Event>) {
    loop {
        let entities = query::entity_view(world);
        let mut commands = Vec::new();
        systems.journal.handle(events, &mut commands);
        systems.dungeon.handle(events, &mut commands);
        systems.swipe.handle(events, &entities, &mut commands);
        events.clear();

        if commands.is_empty() {
            return;
        }
        for command in commands {
            world::apply(world, command, events);
        }
    }
}

/// Draws the grid with the glyphs used by level layouts.
fn render(world: &World) -> String {
    let grid = query::grid(world);
    let (columns, rows) = grid.dimensions();
    let mut map = String::with_capacity((columns as usize + 1) * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            let cell = CellCoord::new(column, row);
            let symbol = match (query::tile(world, cell), query::entity_at(world, cell)) {
                (None, _) => ' ',
                (Some(_), Some(entity)) => glyph(entity.kind),
                (Some(tile), None) if tile.visited => ',',
                (Some(_), None) => '.',
            };
            map.push(symbol);
        }
        map.push('\n');
    }
    map
}

fn glyph(kind: EntityKind) -> char {
    match kind {
        EntityKind::Player => '@',
        EntityKind::Obstacle(ObstacleKind::Wall) => '#',
        EntityKind::Obstacle(ObstacleKind::Rock) => 'r',
        EntityKind::Item { picked_up: false } => 'i',
        EntityKind::Collectable { picked_up: false } => 'c',
        EntityKind::Item { picked_up: true } | EntityKind::Collectable { picked_up: true } => ',',
        EntityKind::Door {
            state: DoorState::Closed,
        } => '+',
        EntityKind::Door {
            state: DoorState::Open,
        } => '\'',
        EntityKind::Ladder {
            direction: LadderDirection::Up,
        } => '<',
        EntityKind::Ladder {
            direction: LadderDirection::Down,
        } => '>',
    }
}
