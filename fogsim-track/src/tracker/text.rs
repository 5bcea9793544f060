// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::sync::{Arc, Mutex};

pub use log;

use crate::tracker::{EntityManager, Track};
use crate::{SharedWriter, Tag, Writer};

/// Writes each track event as one line of text.
///
/// This is the tracker behind `--stdout` style runs: device, tuple and
/// timing events end up interleaved in a single stream that can be
/// filtered per entity through the [`EntityManager`].
pub struct TextTracker {
    entity_manager: EntityManager,

    /// Destination for the formatted event lines.
    writer: SharedWriter,
}

impl TextTracker {
    /// Create a new [`TextTracker`] writing through the given writer.
    pub fn new(entity_manager: EntityManager, writer: Writer) -> Self {
        Self {
            entity_manager,
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

/// One output line per [`Track`] event
impl Track for TextTracker {
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
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{tag}: enter {object}\n").as_bytes())
            .unwrap();
    }

    fn exit(&self, tag: Tag, object: Tag) {
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{tag}: exit {object}\n").as_bytes())
            .unwrap();
    }

    fn create(&self, created_by: Tag, tag: Tag, num_bytes: usize, name: &str) {
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{created_by}: created {tag}, {name}, {num_bytes} bytes\n").as_bytes())
            .unwrap();
    }

    fn destroy(&self, destroyed_by: Tag, tag: Tag) {
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{destroyed_by}: destroyed {tag}\n").as_bytes())
            .unwrap();
    }

    fn connect(&self, connect_from: Tag, connect_to: Tag) {
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{connect_from}: connect to {connect_to}\n").as_bytes())
            .unwrap();
    }

    fn log(&self, tag: Tag, level: log::Level, msg: std::fmt::Arguments) {
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{tag}:{level}: {msg}\n").as_bytes())
            .unwrap();
    }

    fn time(&self, set_by: Tag, time_ms: f64) {
        self.entity_manager.set_time(time_ms);
        self.writer
            .lock()
            .unwrap()
            .write_all(format!("{set_by}: set time to {time_ms:.3}ms\n").as_bytes())
            .unwrap();
    }

    fn shutdown(&self) {
        self.writer.lock().unwrap().flush().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn writes_log_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        let manager = EntityManager::new(log::Level::Info);
        let tracker = TextTracker::new(manager, Box::new(file.reopen().unwrap()));

        let tag = tracker.unique_tag();
        tracker.add_entity(tag, "top");
        assert!(tracker.is_entity_enabled(tag, log::Level::Info));
        assert!(!tracker.is_entity_enabled(tag, log::Level::Debug));

        tracker.log(tag, log::Level::Info, format_args!("hello"));
        tracker.shutdown();

        let mut contents = String::new();
        std::fs::File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, format!("{tag}:INFO: hello\n"));
    }
}
