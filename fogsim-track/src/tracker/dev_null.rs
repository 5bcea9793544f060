// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::tracker::Track;
use crate::{ROOT, Tag};

/// A tracker that does nothing.
///
/// This can be useful for benchmarks that want to have minimum overheads.
/// Tags still need to be unique because model code uses them as identities.
#[derive(Default)]
pub struct DevNullTracker {
    unique_tag: AtomicU64,
}

impl Track for DevNullTracker {
    fn unique_tag(&self) -> Tag {
        let tag = self.unique_tag.fetch_add(1, Ordering::SeqCst);
        Tag(tag + ROOT.0 + 1)
    }

    fn add_entity(&self, _tag: Tag, _entity_name: &str) {}
    fn is_entity_enabled(&self, _tag: Tag, _level: log::Level) -> bool {
        false
    }
    fn enter(&self, _tag: Tag, _obj: Tag) {}
    fn exit(&self, _tag: Tag, _obj: Tag) {}
    fn create(&self, _tag: Tag, _obj: Tag, _num_bytes: usize, _name: &str) {}
    fn destroy(&self, _tag: Tag, _obj: Tag) {}
    fn connect(&self, _from: Tag, _to: Tag) {}
    fn log(&self, _tag: Tag, _level: log::Level, _msg: std::fmt::Arguments) {}
    fn time(&self, _set_by: Tag, _time_ms: f64) {}
    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use crate::tracker::dev_null_tracker;

    #[test]
    fn builds_and_mints_distinct_tags() {
        let tracker = dev_null_tracker();
        let first = tracker.unique_tag();
        let second = tracker.unique_tag();
        assert_ne!(first, second);
        assert!(!tracker.is_entity_enabled(first, log::Level::Error));
    }
}
