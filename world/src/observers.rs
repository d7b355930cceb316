//! Synchronous observer lists invoked as events occur.

use std::{collections::BTreeMap, fmt};

use delve_core::{EntityId, Event};

/// Callback invoked synchronously for every matching event.
pub type Observer = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub(crate) struct Observers {
    global: Vec<Observer>,
    per_entity: BTreeMap<EntityId, Vec<Observer>>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, entity: EntityId, observer: Observer) {
        self.per_entity.entry(entity).or_default().push(observer);
    }

    pub(crate) fn subscribe_all(&mut self, observer: Observer) {
        self.global.push(observer);
    }

    pub(crate) fn forget(&mut self, entity: EntityId) {
        let _ = self.per_entity.remove(&entity);
    }

    pub(crate) fn forget_entities(&mut self) {
        self.per_entity.clear();
    }

    fn notify(&mut self, event: &Event) {
        if let Some(entity) = event.subject() {
            if let Some(observers) = self.per_entity.get_mut(&entity) {
                for observer in observers.iter_mut() {
                    observer(event);
                }
            }
        }
        for observer in &mut self.global {
            observer(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_entity: usize = self.per_entity.values().map(Vec::len).sum();
        f.debug_struct("Observers")
            .field("global", &self.global.len())
            .field("per_entity", &per_entity)
            .finish()
    }
}

/// Delivers events to observers and appends them to the caller's buffer.
pub(crate) struct Emitter<'a> {
    observers: &'a mut Observers,
    out: &'a mut Vec<Event>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(observers: &'a mut Observers, out: &'a mut Vec<Event>) -> Self {
        Self { observers, out }
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.observers.notify(&event);
        self.out.push(event);
    }
}
