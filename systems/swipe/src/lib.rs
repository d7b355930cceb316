#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement queue that turns directional swipes into one-step move requests.
//!
//! Swipes arrive faster than the controlled entity can walk. The buffer keeps
//! them in arrival order and releases the next one only once the world has
//! resolved the previous request, so every swipe becomes exactly one turn.
//! When the player takes a ladder the backlog carries over to the player
//! spawned on the next level.

use std::{collections::VecDeque, time::Duration};

use delve_core::{Command, Direction, EntityId, EntityKind, EntityView, Event};
use log::debug;

/// Progress of the most recently released swipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Turn {
    /// No request is outstanding.
    Idle,
    /// A request was emitted and its outcome has not been observed yet.
    Requested,
    /// The world accepted the request and the entity is travelling.
    InFlight,
}

/// Pure system that queues swipes for a single controlled entity.
#[derive(Debug)]
pub struct SwipeBuffer {
    entity: EntityId,
    step_duration: Duration,
    capacity: Option<usize>,
    pending: VecDeque<Direction>,
    turn: Turn,
    awaiting_player: bool,
}

impl SwipeBuffer {
    /// Creates an unbounded buffer steering `entity` one cell per swipe.
    #[must_use]
    pub fn new(entity: EntityId, step_duration: Duration) -> Self {
        Self {
            entity,
            step_duration,
            capacity: None,
            pending: VecDeque::new(),
            turn: Turn::Idle,
            awaiting_player: false,
        }
    }

    /// Creates an empty buffer that retains at most `capacity` swipes.
    #[must_use]
    pub fn with_capacity(entity: EntityId, step_duration: Duration, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            pending: VecDeque::with_capacity(capacity),
            ..Self::new(entity, step_duration)
        }
    }

    /// Entity the buffer steers.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Appends a swipe to the back of the queue.
    ///
    /// Returns `false` when a capacity was set, the queue is full and the
    /// swipe was discarded.
    pub fn push(&mut self, direction: Direction) -> bool {
        if self
            .capacity
            .is_some_and(|capacity| self.pending.len() >= capacity)
        {
            debug!(
                "swipe buffer for entity {} full, dropping {direction:?}",
                self.entity.get()
            );
            return false;
        }
        self.pending.push_back(direction);
        true
    }

    /// Drops every swipe that has not been released yet.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of swipes waiting to be released.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether no swipes are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Reports whether a released swipe is still being resolved or travelled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.turn != Turn::Idle
    }

    /// Consumes world events and the entity view to release the next swipe.
    ///
    /// At most one [`Command::RequestMove`] is emitted per call, and only when
    /// the entity is idle and the previous request has been resolved. A
    /// request that produced no `MoveStarted` by the following call counts as
    /// a spent turn. After the entity takes a ladder or the grid is rebuilt,
    /// the backlog waits for the next player spawn and steers that entity.
    pub fn handle(&mut self, events: &[Event], entities: &EntityView, out: &mut Vec<Command>) {
        let mut started = false;
        for event in events {
            match event {
                Event::MoveStarted { entity, .. } if *entity == self.entity => {
                    started = true;
                    self.turn = Turn::InFlight;
                }
                Event::MoveEnded { entity, .. } if *entity == self.entity => {
                    self.turn = Turn::Idle;
                }
                Event::EntityDespawned { entity, .. } if *entity == self.entity => {
                    self.pending.clear();
                    self.turn = Turn::Idle;
                }
                Event::LevelExited { entity, .. } if *entity == self.entity => {
                    self.turn = Turn::Idle;
                    self.awaiting_player = true;
                }
                Event::GridConfigured { .. } => {
                    self.turn = Turn::Idle;
                    self.awaiting_player = true;
                }
                Event::EntitySpawned {
                    entity,
                    kind: EntityKind::Player,
                    ..
                } if self.awaiting_player => {
                    debug!(
                        "swipe buffer follows player {} from {}",
                        entity.get(),
                        self.entity.get()
                    );
                    self.entity = *entity;
                    self.awaiting_player = false;
                }
                _ => {}
            }
        }

        if self.turn == Turn::Requested && !started {
            self.turn = Turn::Idle;
        }
        if self.turn != Turn::Idle || self.awaiting_player {
            return;
        }

        let Some(snapshot) = entities.get(self.entity) else {
            return;
        };
        if snapshot.moving {
            return;
        }

        while let Some(direction) = self.pending.pop_front() {
            let Some(target) = snapshot.cell.step(direction) else {
                debug!(
                    "skipping {direction:?} swipe for entity {}: leaves the grid",
                    self.entity.get()
                );
                continue;
            };
            out.push(Command::RequestMove {
                entity: self.entity,
                target,
                duration: self.step_duration,
            });
            self.turn = Turn::Requested;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::{CellCoord, EntitySnapshot, LadderDirection, WorldPoint};

    const STEP: Duration = Duration::from_millis(250);

    fn view(entity: EntityId, cell: CellCoord, moving: bool) -> EntityView {
        EntityView::from_snapshots(vec![EntitySnapshot {
            id: entity,
            kind: EntityKind::Player,
            cell,
            moving,
            position: WorldPoint::new(0.0, 0.0),
        }])
    }

    #[test]
    fn releases_one_request_per_call() {
        let entity = EntityId::new(4);
        let mut buffer = SwipeBuffer::new(entity, STEP);
        assert!(buffer.push(Direction::East));
        assert!(buffer.push(Direction::South));

        let mut out = Vec::new();
        buffer.handle(&[], &view(entity, CellCoord::new(2, 2), false), &mut out);
        assert_eq!(
            out,
            vec![Command::RequestMove {
                entity,
                target: CellCoord::new(3, 2),
                duration: STEP,
            }]
        );
        assert_eq!(buffer.len(), 1);
        assert!(buffer.is_busy());
    }

    #[test]
    fn waits_for_move_end_before_next_release() {
        let entity = EntityId::new(0);
        let mut buffer = SwipeBuffer::new(entity, STEP);
        let _ = buffer.push(Direction::North);
        let _ = buffer.push(Direction::North);

        let mut out = Vec::new();
        buffer.handle(&[], &view(entity, CellCoord::new(1, 3), false), &mut out);
        out.clear();

        let started = Event::MoveStarted {
            entity,
            from: CellCoord::new(1, 3),
            to: CellCoord::new(1, 2),
        };
        buffer.handle(&[started], &view(entity, CellCoord::new(1, 3), true), &mut out);
        assert!(out.is_empty());

        buffer.handle(&[], &view(entity, CellCoord::new(1, 2), true), &mut out);
        assert!(out.is_empty());

        let ended = Event::MoveEnded {
            entity,
            cell: CellCoord::new(1, 2),
        };
        buffer.handle(&[ended], &view(entity, CellCoord::new(1, 2), false), &mut out);
        assert_eq!(
            out,
            vec![Command::RequestMove {
                entity,
                target: CellCoord::new(1, 1),
                duration: STEP,
            }]
        );
    }

    #[test]
    fn unanswered_request_spends_the_turn() {
        let entity = EntityId::new(0);
        let mut buffer = SwipeBuffer::new(entity, STEP);
        let _ = buffer.push(Direction::West);
        let _ = buffer.push(Direction::South);
        let entities = view(entity, CellCoord::new(1, 1), false);

        let mut out = Vec::new();
        buffer.handle(&[], &entities, &mut out);
        buffer.handle(&[], &entities, &mut out);
        assert_eq!(out.len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn skips_swipes_leaving_coordinate_space() {
        let entity = EntityId::new(0);
        let mut buffer = SwipeBuffer::new(entity, STEP);
        let _ = buffer.push(Direction::NorthWest);
        let _ = buffer.push(Direction::East);

        let mut out = Vec::new();
        buffer.handle(&[], &view(entity, CellCoord::new(0, 0), false), &mut out);
        assert_eq!(
            out,
            vec![Command::RequestMove {
                entity,
                target: CellCoord::new(1, 0),
                duration: STEP,
            }]
        );
    }

    #[test]
    fn default_buffer_keeps_every_swipe() {
        let mut buffer = SwipeBuffer::new(EntityId::new(0), STEP);
        for _ in 0..20 {
            assert!(buffer.push(Direction::East));
        }
        assert_eq!(buffer.len(), 20);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_busy());
    }

    #[test]
    fn backlog_follows_player_onto_the_next_level() {
        let old = EntityId::new(1);
        let new = EntityId::new(30);
        let mut buffer = SwipeBuffer::new(old, STEP);
        let _ = buffer.push(Direction::East);
        let _ = buffer.push(Direction::East);

        let mut out = Vec::new();
        buffer.handle(&[], &view(old, CellCoord::new(1, 1), false), &mut out);
        buffer.handle(
            &[Event::MoveStarted {
                entity: old,
                from: CellCoord::new(1, 1),
                to: CellCoord::new(2, 1),
            }],
            &view(old, CellCoord::new(1, 1), true),
            &mut out,
        );
        out.clear();

        buffer.handle(
            &[
                Event::MoveEnded {
                    entity: old,
                    cell: CellCoord::new(2, 1),
                },
                Event::LevelExited {
                    entity: old,
                    ladder: EntityId::new(2),
                    direction: LadderDirection::Down,
                },
            ],
            &view(old, CellCoord::new(2, 1), false),
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(buffer.len(), 1);

        buffer.handle(
            &[
                Event::GridConfigured {
                    columns: 6,
                    rows: 6,
                },
                Event::EntitySpawned {
                    entity: new,
                    kind: EntityKind::Player,
                    cell: CellCoord::new(3, 3),
                },
            ],
            &view(new, CellCoord::new(3, 3), false),
            &mut out,
        );
        assert_eq!(buffer.entity(), new);
        assert_eq!(
            out,
            vec![Command::RequestMove {
                entity: new,
                target: CellCoord::new(4, 3),
                duration: STEP,
            }]
        );
    }

    #[test]
    fn overflow_drops_newest_swipes() {
        let mut buffer = SwipeBuffer::with_capacity(EntityId::new(0), STEP, 2);
        assert!(buffer.push(Direction::East));
        assert!(buffer.push(Direction::West));
        assert!(!buffer.push(Direction::North));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn despawn_clears_backlog() {
        let entity = EntityId::new(2);
        let mut buffer = SwipeBuffer::new(entity, STEP);
        let _ = buffer.push(Direction::East);
        let mut out = Vec::new();
        buffer.handle(
            &[Event::EntityDespawned {
                entity,
                cell: CellCoord::new(0, 0),
            }],
            &EntityView::from_snapshots(Vec::new()),
            &mut out,
        );
        assert!(out.is_empty());
        assert!(buffer.is_empty());
        assert!(!buffer.is_busy());
    }

    #[test]
    fn moving_entity_holds_the_queue() {
        let entity = EntityId::new(0);
        let mut buffer = SwipeBuffer::new(entity, STEP);
        let _ = buffer.push(Direction::East);
        let mut out = Vec::new();
        buffer.handle(&[], &view(entity, CellCoord::new(0, 0), true), &mut out);
        assert!(out.is_empty());
        assert_eq!(buffer.len(), 1);
    }
}
