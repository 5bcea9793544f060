// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::sync::Mutex;

use crate::Tag;
use crate::tracker::{EntityManager, Track};

/// A [`Track`] event kept in memory.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// The [`Tag`](crate::Tag) of the event originator.
    pub tag: Tag,

    /// The time at which the event occurred.
    pub time: f64,

    /// Any event-specific state.
    pub event: Event,
}

/// The event-specific part of an [`EventRecord`].
#[derive(Debug, Clone)]
pub enum Event {
    /// An object was created.
    Create {
        /// The tag of the created object.
        created: Tag,
        /// Size of the created object.
        num_bytes: usize,
        /// Display name of the created object.
        name: String,
    },
    /// An object was destroyed.
    Destroy {
        /// The tag of the destroyed object.
        destroyed: Tag,
    },
    /// A log message was emitted.
    Log {
        /// Severity of the message.
        level: log::Level,
        /// The formatted message.
        text: String,
    },
    /// An object entered an entity.
    Enter {
        /// The tag of the entering object.
        entered: Tag,
    },
    /// An object left an entity.
    Exit {
        /// The tag of the exiting object.
        exited: Tag,
    },
    /// Two entities were connected.
    Connect {
        /// The tag of the entity connected to.
        to: Tag,
    },
}

/// A tracker that keeps all events in memory for later inspection.
///
/// Used by tests and analysis passes that want to query what happened
/// during a run rather than parse text output.
pub struct InMemoryTracker {
    entity_manager: EntityManager,
    events: Mutex<Vec<EventRecord>>,
}

impl InMemoryTracker {
    /// Create a new [`InMemoryTracker`] with an [`EntityManager`].
    #[must_use]
    pub fn new(entity_manager: EntityManager) -> Self {
        Self {
            entity_manager,
            events: Mutex::new(Vec::new()),
        }
    }

    fn add_event(&self, tag: Tag, event: Event) {
        let time = self.entity_manager.time();
        self.events
            .lock()
            .unwrap()
            .push(EventRecord { tag, time, event });
    }

    /// Return a copy of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    /// Count creation events attributed to the given entity.
    #[must_use]
    pub fn count_created(&self, tag: Tag) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tag == tag)
            .filter(|e| matches!(e.event, Event::Create { .. }))
            .count()
    }

    /// Count log messages at the given level across all entities.
    #[must_use]
    pub fn count_logs_at(&self, level: log::Level) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(&e.event, Event::Log { level: l, .. } if *l == level))
            .count()
    }

    /// Return the text of all log messages emitted by the given entity.
    #[must_use]
    pub fn logs_for(&self, tag: Tag) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tag == tag)
            .filter_map(|e| match &e.event {
                Event::Log { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Track for InMemoryTracker {
    fn unique_tag(&self) -> Tag {
        self.entity_manager.unique_tag()
    }

    fn add_entity(&self, tag: Tag, entity_name: &str) {
        self.entity_manager.add_entity(tag, entity_name);
    }

    fn is_entity_enabled(&self, tag: Tag, level: log::Level) -> bool {
        self.entity_manager.is_enabled(tag, level)
    }

    fn enter(&self, tag: Tag, object: Tag) {
        self.add_event(tag, Event::Enter { entered: object });
    }

    fn exit(&self, tag: Tag, object: Tag) {
        self.add_event(tag, Event::Exit { exited: object });
    }

    fn create(&self, created_by: Tag, tag: Tag, num_bytes: usize, name: &str) {
        self.add_event(
            created_by,
            Event::Create {
                created: tag,
                num_bytes,
                name: String::from(name),
            },
        );
    }

    fn destroy(&self, destroyed_by: Tag, tag: Tag) {
        self.add_event(destroyed_by, Event::Destroy { destroyed: tag });
    }

    fn connect(&self, connect_from: Tag, connect_to: Tag) {
        self.add_event(connect_from, Event::Connect { to: connect_to });
    }

    fn log(&self, tag: Tag, level: log::Level, msg: std::fmt::Arguments) {
        self.add_event(
            tag,
            Event::Log {
                level,
                text: format!("{msg}"),
            },
        );
    }

    fn time(&self, _set_by: Tag, time_ms: f64) {
        self.entity_manager.set_time(time_ms);
    }

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ROOT;

    #[test]
    fn records_events_with_time() {
        let tracker = InMemoryTracker::new(EntityManager::new(log::Level::Trace));
        let top = tracker.unique_tag();
        tracker.add_entity(top, "top");

        let obj = tracker.unique_tag();
        tracker.create(top, obj, 42, "tuple");
        tracker.time(top, 5.0);
        tracker.log(top, log::Level::Info, format_args!("routed"));
        tracker.destroy(top, obj);

        let events = tracker.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].time, 0.0);
        assert_eq!(events[1].time, 5.0);
        assert_eq!(tracker.count_created(top), 1);
        assert_eq!(tracker.count_logs_at(log::Level::Info), 1);
        assert_eq!(tracker.logs_for(top), vec![String::from("routed")]);
        assert!(top.0 > ROOT.0);
    }
}
