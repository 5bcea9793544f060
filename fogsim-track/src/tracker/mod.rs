// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Define the [`Track`] trait and a number of [`Tracker`]s.

/// Include the /dev/null tracker.
pub mod dev_null;
/// Include the in-memory tracker.
pub mod in_memory;
/// Include the text-based tracker.
pub mod text;

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub use dev_null::DevNullTracker;
pub use in_memory::InMemoryTracker;
use regex::Regex;
pub use text::TextTracker;

use crate::{ROOT, Tag};

/// This is the interface that is supported by all [`Tracker`]s.
pub trait Track {
    /// Allocate a new global tag
    fn unique_tag(&self) -> Tag;

    /// Register an entity name against its tag so that filters can be
    /// resolved per entity.
    fn add_entity(&self, tag: Tag, entity_name: &str);

    /// Determine whether events at the given level are enabled for an entity.
    fn is_entity_enabled(&self, tag: Tag, level: log::Level) -> bool;

    /// Track when an object with the given tag arrives.
    fn enter(&self, enter_into: Tag, enter_obj: Tag);

    /// Track when an object with the given tag leaves.
    fn exit(&self, exit_from: Tag, exit_obj: Tag);

    /// Track when an object with the given tag is created.
    fn create(&self, created_by: Tag, created_obj: Tag, num_bytes: usize, name: &str);

    /// Track when an object with the given tag is destroyed.
    fn destroy(&self, destroyed_by: Tag, destroyed_obj: Tag);

    /// Track a connection between two entities.
    fn connect(&self, connect_from: Tag, connect_to: Tag);

    /// Track a log message of the given level.
    fn log(&self, msg_by: Tag, level: log::Level, msg: std::fmt::Arguments);

    /// Advance the time to the time specified in `ms`.
    fn time(&self, set_by: Tag, time_ms: f64);

    /// Flush any buffered output.
    fn shutdown(&self);
}

/// The type of a [`Tracker`] that is shared across entities.
pub type Tracker = Arc<dyn Track + Send + Sync>;

/// Create a [`Tracker`] that prints all track events to `stdout`.
pub fn stdout_tracker() -> Tracker {
    let entity_manager = EntityManager::new(log::Level::Warn);
    let stdout_writer = Box::new(io::BufWriter::new(io::stdout()));
    let tracker: Tracker = Arc::new(TextTracker::new(entity_manager, stdout_writer));
    tracker
}

/// Create a [`Tracker`] that suppresses all track events.
pub fn dev_null_tracker() -> Tracker {
    let tracker: Tracker = Arc::new(DevNullTracker::default());
    tracker
}

/// The [`EntityManager`] is responsible for determining entity log / trace
/// enable states.
///
/// This is shared by the [`Text`](crate::tracker::text) and
/// [`InMemory`](crate::tracker::in_memory) trackers.
///
/// This manager is also used to allocate unique [`Tag`] values.
pub struct EntityManager {
    /// Level of _log_ events to output when no filter matches.
    default_log_level: log::Level,

    /// List of regular expressions mapping entity names to log levels.
    regex_to_log_level: Vec<(Regex, log::Level)>,

    /// Resolved level per registered entity tag.
    tag_to_log_level: Mutex<HashMap<Tag, log::Level>>,

    /// Used to assign unique tags.
    unique_tag: AtomicU64,

    /// Keep track of the current time.
    current_time: Mutex<f64>,
}

impl EntityManager {
    /// Constructor with the default [`log::Level`]
    #[must_use]
    pub fn new(default_log_level: log::Level) -> Self {
        Self {
            default_log_level,
            regex_to_log_level: Vec::new(),
            tag_to_log_level: Mutex::new(HashMap::new()),
            unique_tag: AtomicU64::new(ROOT.0 + 1),
            current_time: Mutex::new(0.0),
        }
    }

    fn unique_tag(&self) -> Tag {
        let tag = self.unique_tag.fetch_add(1, Ordering::SeqCst);
        Tag(tag)
    }

    fn log_level_for(&self, entity_name: &str) -> log::Level {
        for (regex, level) in self.regex_to_log_level.iter() {
            if regex.is_match(entity_name) {
                return *level;
            }
        }
        self.default_log_level
    }

    fn add_entity(&self, tag: Tag, entity_name: &str) {
        let level = self.log_level_for(entity_name);
        self.tag_to_log_level.lock().unwrap().insert(tag, level);
    }

    fn is_enabled(&self, tag: Tag, level: log::Level) -> bool {
        let levels = self.tag_to_log_level.lock().unwrap();
        let max_level = levels.get(&tag).copied().unwrap_or(self.default_log_level);
        level <= max_level
    }

    /// Add a log filter regular expression.
    ///
    /// The first pattern added has the highest priority. Filters only apply
    /// to entities registered after the filter was added.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fogsim_track::tracker::EntityManager;
    /// let mut manager = EntityManager::new(log::Level::Warn);
    /// manager.add_log_filter(".*uplink.*", log::Level::Trace);
    /// ```
    pub fn add_log_filter(&mut self, regex_str: &str, level: crate::log::Level) {
        match Regex::new(regex_str) {
            Ok(regex) => self.regex_to_log_level.push((regex, level)),
            Err(e) => panic!("Failed to parse regex {regex_str}:\n{}\n", e),
        };
    }

    fn time(&self) -> f64 {
        *self.current_time.lock().unwrap()
    }

    fn set_time(&self, new_time: f64) {
        let mut time_guard = self.current_time.lock().unwrap();
        assert!(new_time >= *time_guard);
        *time_guard = new_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_paths() -> Vec<&'static str> {
        vec![
            "top",
            "top::cloud",
            "top::cloud::uplink",
            "top::cloud::downlink0",
        ]
    }

    #[test]
    fn no_filters() {
        let manager = EntityManager::new(log::Level::Error);

        for p in entity_paths() {
            assert_eq!(manager.log_level_for(p), log::Level::Error);
        }
    }

    #[test]
    fn filter_cloud_trace() {
        let mut manager = EntityManager::new(log::Level::Error);
        manager.add_log_filter(r".*cloud.*", log::Level::Trace);

        let expected_levels = [
            log::Level::Error,
            log::Level::Trace,
            log::Level::Trace,
            log::Level::Trace,
        ];

        for (i, p) in entity_paths().iter().enumerate() {
            assert_eq!(manager.log_level_for(p), expected_levels[i]);
        }
    }

    #[test]
    fn filter_priority_order() {
        let mut manager = EntityManager::new(log::Level::Error);
        // The first pattern seen should be highest priority
        manager.add_log_filter(r".*uplink", log::Level::Info);
        manager.add_log_filter(r".*cloud.*", log::Level::Trace);
        manager.add_log_filter(r"top.*", log::Level::Warn);

        let expected_levels = [
            log::Level::Warn,
            log::Level::Trace,
            log::Level::Info,
            log::Level::Trace,
        ];

        for (i, p) in entity_paths().iter().enumerate() {
            assert_eq!(manager.log_level_for(p), expected_levels[i]);
        }
    }

    #[test]
    fn enables_resolved_at_registration() {
        let mut manager = EntityManager::new(log::Level::Warn);
        manager.add_log_filter(r".*uplink", log::Level::Trace);

        let uplink = manager.unique_tag();
        manager.add_entity(uplink, "top::cloud::uplink");
        let other = manager.unique_tag();
        manager.add_entity(other, "top::cloud");

        assert!(manager.is_enabled(uplink, log::Level::Trace));
        assert!(!manager.is_enabled(other, log::Level::Info));
        assert!(manager.is_enabled(other, log::Level::Warn));
    }

    #[test]
    fn tags() {
        let manager = EntityManager::new(log::Level::Error);
        for i in 0..10 {
            assert_eq!(manager.unique_tag(), Tag(i + ROOT.0 + 1));
        }
    }

    #[test]
    fn time_is_monotonic() {
        let manager = EntityManager::new(log::Level::Error);
        manager.set_time(1.5);
        manager.set_time(2.0);
        assert_eq!(manager.time(), 2.0);
    }
}
