use std::time::Duration;

use delve_core::{
    CellCoord, Command, Direction, DoorState, EntityId, EntityKind, Event, ObstacleKind, TileKind,
};
use delve_system_swipe::SwipeBuffer;
use delve_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(200);

struct Harness {
    world: World,
    buffer: SwipeBuffer,
    events: Vec<Event>,
    log: Vec<Event>,
}

impl Harness {
    fn new(columns: u32, rows: u32, player_cell: CellCoord) -> Self {
        let mut world = World::with_seed(11);
        let mut events = Vec::new();
        world::apply(
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
                world::apply(
                    &mut world,
                    Command::PlaceTile {
                        cell: CellCoord::new(column, row),
                        kind: TileKind::Floor,
                    },
                    &mut events,
                );
            }
        }
        events.clear();
        world::apply(
            &mut world,
            Command::SpawnEntity {
                cell: player_cell,
                kind: EntityKind::Player,
            },
            &mut events,
        );
        let player = match events.as_slice() {
            [Event::EntitySpawned { entity, .. }] => *entity,
            other => panic!("unexpected spawn events: {other:?}"),
        };
        events.clear();

        Self {
            world,
            buffer: SwipeBuffer::new(player, STEP),
            events,
            log: Vec::new(),
        }
    }

    fn player(&self) -> EntityId {
        self.buffer.entity()
    }

    fn spawn(&mut self, cell: CellCoord, kind: EntityKind) -> EntityId {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::SpawnEntity { cell, kind }, &mut events);
        match events.as_slice() {
            [Event::EntitySpawned { entity, .. }] => *entity,
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    fn pump(&mut self) {
        loop {
            let view = query::entity_view(&self.world);
            let mut commands = Vec::new();
            self.buffer.handle(&self.events, &view, &mut commands);
            self.log.append(&mut self.events);
            if commands.is_empty() {
                break;
            }
            for command in commands {
                world::apply(&mut self.world, command, &mut self.events);
            }
        }
    }

    fn run(&mut self, frames: usize) {
        self.pump();
        for _ in 0..frames {
            world::apply(
                &mut self.world,
                Command::Tick {
                    dt: Duration::from_millis(50),
                },
                &mut self.events,
            );
            self.pump();
        }
    }

    fn started_targets(&self) -> Vec<CellCoord> {
        self.log
            .iter()
            .filter_map(|event| match event {
                Event::MoveStarted { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn queued_swipes_execute_in_arrival_order() {
    let mut harness = Harness::new(6, 6, CellCoord::new(1, 1));
    for direction in [Direction::East, Direction::SouthEast, Direction::South] {
        assert!(harness.buffer.push(direction));
    }

    harness.run(20);

    assert_eq!(
        harness.started_targets(),
        vec![
            CellCoord::new(2, 1),
            CellCoord::new(3, 2),
            CellCoord::new(3, 3),
        ]
    );
    assert_eq!(
        query::entity(&harness.world, harness.player()).map(|snapshot| snapshot.cell),
        Some(CellCoord::new(3, 3))
    );
    assert!(harness.buffer.is_empty());
    assert!(!harness.buffer.is_busy());
}

#[test]
fn only_one_request_is_in_flight_at_a_time() {
    let mut harness = Harness::new(8, 1, CellCoord::new(0, 0));
    for _ in 0..5 {
        let _ = harness.buffer.push(Direction::East);
    }

    harness.run(40);

    let mut moving = false;
    for event in &harness.log {
        match event {
            Event::MoveStarted { .. } => {
                assert!(!moving, "a second move started before the first ended");
                moving = true;
            }
            Event::MoveEnded { .. } => moving = false,
            _ => {}
        }
    }
    assert_eq!(harness.started_targets().len(), 5);
}

#[test]
fn blocked_swipe_is_spent_and_the_next_proceeds() {
    let mut harness = Harness::new(5, 5, CellCoord::new(2, 2));
    let _ = harness.spawn(CellCoord::new(3, 2), EntityKind::Obstacle(ObstacleKind::Rock));
    let _ = harness.buffer.push(Direction::East);
    let _ = harness.buffer.push(Direction::North);

    harness.run(10);

    assert_eq!(harness.started_targets(), vec![CellCoord::new(2, 1)]);
}

#[test]
fn door_swipe_opens_then_following_swipe_enters() {
    let mut harness = Harness::new(5, 5, CellCoord::new(2, 2));
    let door = harness.spawn(
        CellCoord::new(3, 2),
        EntityKind::Door {
            state: DoorState::Closed,
        },
    );
    let _ = harness.buffer.push(Direction::East);
    let _ = harness.buffer.push(Direction::East);

    harness.run(10);

    let player = harness.player();
    assert!(harness
        .log
        .contains(&Event::DoorOpened { entity: player, door }));
    assert_eq!(harness.started_targets(), vec![CellCoord::new(3, 2)]);
    assert_eq!(
        query::grid(&harness.world).occupant(CellCoord::new(3, 2)),
        Some(player)
    );
}
