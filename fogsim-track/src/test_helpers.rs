// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! This module provides helper functions for testing logging output
//!
//! The aim of this module is to provide commonly-used functions that enable the
//! testing of the output that should appear from logging macros.

use core::sync::atomic::Ordering;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::tracker::{EntityManager, TextTracker};
use crate::{Tag, Track, Tracker};

/// Create a [`Tracker`] writing to a log file named after the test file.
///
/// The log files end up under `target/test-logs/` so failing runs can be
/// inspected without polluting test stdout.
#[must_use]
pub fn create_tracker(full_filepath: &str) -> Tracker {
    let stem = Path::new(full_filepath)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("test");
    let dir = Path::new("target").join("test-logs");
    fs::create_dir_all(&dir).unwrap();
    let file = fs::File::create(dir.join(format!("{stem}.log"))).unwrap();
    let manager = EntityManager::new(log::Level::Debug);
    Arc::new(TextTracker::new(manager, Box::new(file)))
}

/// A tracker that keeps track events.
pub struct TestTracker {
    events: Mutex<Vec<String>>,

    unique_tag: AtomicU64,
}

impl TestTracker {
    /// Create a new [`Tracker`](crate::Tracker) for the tests.
    ///
    /// This keeps the track events in memory for checking later.
    #[must_use]
    pub fn new(initial_tag: u64) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            unique_tag: AtomicU64::new(initial_tag),
        }
    }

    fn add_event(&self, event: String) {
        println!("{event}");
        let mut events = self.events.lock().unwrap();
        events.push(event);
    }
}

impl Track for TestTracker {
    fn unique_tag(&self) -> Tag {
        let tag = self.unique_tag.fetch_add(1, Ordering::SeqCst);
        Tag(tag)
    }

    fn add_entity(&self, _tag: Tag, _entity_name: &str) {
        // Do nothing
    }

    fn is_entity_enabled(&self, _tag: Tag, _level: log::Level) -> bool {
        true
    }

    fn enter(&self, tag: Tag, item: Tag) {
        self.add_event(format!("{tag}: {item} entered"));
    }

    fn exit(&self, tag: Tag, item: Tag) {
        self.add_event(format!("{tag}: {item} exited"));
    }

    fn create(&self, created_by: Tag, tag: Tag, num_bytes: usize, name: &str) {
        self.add_event(format!("{created_by}: created {tag}, {name}, {num_bytes} bytes"));
    }

    fn destroy(&self, destroyed_by: Tag, tag: Tag) {
        self.add_event(format!("{destroyed_by}: destroyed {tag}"));
    }

    fn connect(&self, connect_from: Tag, connect_to: Tag) {
        self.add_event(format!("{connect_from}: connect to {connect_to}"));
    }

    fn log(&self, tag: Tag, level: log::Level, msg: std::fmt::Arguments) {
        self.add_event(format!("{tag}:{level}: {msg}"));
    }

    fn time(&self, set_by: Tag, time_ms: f64) {
        self.add_event(format!("{set_by}: set time {time_ms:.1}ms"));
    }

    fn shutdown(&self) {
        // Do nothing
    }
}

/// Initialise the logging system for tests
///
/// Install a tracker that records all _log_ and _trace_ events to an
/// in-memory string list that can be checked with
/// [`check_and_clear`](test_helpers::check_and_clear).
///
/// # Arguments
///
/// * `start_tag` - The tag value to be set as the starting value
///
/// # Examples
///
/// ```
/// use fogsim_track::test_helpers;
///
/// # /* Need to comment this out so that it is actually built/tested by the infrastructure
/// #[test]
/// # */
/// fn smoke() {
///     let (test_tracker, tracker) = fogsim_track::test_init!(10);
///     let top = fogsim_track::entity::toplevel(&tracker, "top");
///     test_helpers::check_and_clear(&test_tracker, &["0: created 10, top"]);
/// }
/// ```
#[macro_export]
macro_rules! test_init {
    ($start_tag:expr) => {{
        let test_tracker = std::sync::Arc::new($crate::test_helpers::TestTracker::new($start_tag));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Check and clear the _trace_ and _log_ output
///
/// This function asserts that the logging output lines seen since the start or
/// the last time this function was called are expected. It then clears the
/// output recorded so far.
///
/// # Arguments
///
/// * `tracker`  - A reference to the [`TestTracker`] being used in the test.
/// * `expected` - An array of expected regular expressions that the logging
///   output will be matched against.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let mut log_contents_ref = tracker.events.lock().unwrap();

    println!("Checking {:?} matches {:?}", expected, *log_contents_ref);

    // Check that there are the same number of strings produced as expected
    let num_strings = expected.len();
    assert_eq!(num_strings, log_contents_ref.len());

    for i in 0..num_strings {
        let log_expect = expected[i];
        let re = Regex::new(log_expect).unwrap();
        let actual = &(*log_contents_ref[i]);
        println!("Checking {i}: {log_expect:?} matches {actual:?}");
        assert!(re.is_match(actual));
    }

    log_contents_ref.clear();
}

/// Discard any _trace_ and _log_ output recorded so far.
pub fn clear(tracker: &TestTracker) {
    tracker.events.lock().unwrap().clear();
}
