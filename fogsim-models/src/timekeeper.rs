// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Loop-latency and execution-time bookkeeping.
//!
//! The registry is a shared context object: every device, sensor and
//! actuator holds a clone of the same handle. Emit timestamps are recorded
//! when a tuple starts a monitored loop and consumed exactly once when the
//! loop's final edge is received.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fogsim_track::Tag;

use crate::tuple::LogicalTupleId;

/// Identity of a monitored application loop.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct LoopId(pub u64);

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "loop{}", self.0)
    }
}

#[derive(Default)]
struct Inner {
    next_loop_id: u64,
    next_logical_id: u64,

    /// Emit timestamp per outstanding logical tuple id.
    emit_times: HashMap<LogicalTupleId, f64>,

    /// Logical tuple ids minted for each loop, in emission order.
    outstanding: HashMap<LoopId, Vec<LogicalTupleId>>,

    /// Running (average, sample count) per loop.
    averages: HashMap<LoopId, (f64, u64)>,

    /// Execution start time per in-flight tuple tag.
    exec_start: HashMap<Tag, f64>,

    /// Running (average, sample count) of execution time per tuple type.
    exec_stats: HashMap<String, (f64, u64)>,
}

/// Shared latency statistics handle.
#[derive(Clone, Default)]
pub struct LatencyRegistry {
    inner: Rc<RefCell<Inner>>,
}

impl LatencyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a monitored loop.
    pub fn new_loop_id(&self) -> LoopId {
        let mut inner = self.inner.borrow_mut();
        let id = LoopId(inner.next_loop_id);
        inner.next_loop_id += 1;
        id
    }

    /// Allocate a logical tuple id for loop correlation.
    pub fn new_id(&self) -> LogicalTupleId {
        let mut inner = self.inner.borrow_mut();
        let id = LogicalTupleId(inner.next_logical_id);
        inner.next_logical_id += 1;
        id
    }

    /// Record that `id` was emitted for `loop_id` at `now_ms`.
    pub fn record_emit(&self, loop_id: LoopId, id: LogicalTupleId, now_ms: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.emit_times.insert(id, now_ms);
        inner.outstanding.entry(loop_id).or_default().push(id);
    }

    /// Take the emit time recorded for `id`, if any.
    ///
    /// Each id is consumed exactly once; a second call returns `None`.
    pub fn consume_emit(&self, id: LogicalTupleId) -> Option<f64> {
        self.inner.borrow_mut().emit_times.remove(&id)
    }

    /// Fold a delay sample into the loop's running average.
    pub fn fold_sample(&self, loop_id: LoopId, delay_ms: f64) {
        let mut inner = self.inner.borrow_mut();
        let (avg, count) = inner.averages.entry(loop_id).or_insert((0.0, 0));
        *avg = (*avg * (*count as f64) + delay_ms) / ((*count + 1) as f64);
        *count += 1;
    }

    /// The running average delay for a loop, if any samples were folded.
    #[must_use]
    pub fn loop_average(&self, loop_id: LoopId) -> Option<f64> {
        self.inner.borrow().averages.get(&loop_id).map(|s| s.0)
    }

    /// The number of samples folded for a loop.
    #[must_use]
    pub fn sample_count(&self, loop_id: LoopId) -> u64 {
        self.inner
            .borrow()
            .averages
            .get(&loop_id)
            .map_or(0, |s| s.1)
    }

    /// The number of ids ever minted for a loop.
    #[must_use]
    pub fn emitted_count(&self, loop_id: LoopId) -> usize {
        self.inner
            .borrow()
            .outstanding
            .get(&loop_id)
            .map_or(0, Vec::len)
    }

    /// Note that execution of the tuple with `tag` began at `now_ms`.
    pub fn execution_started(&self, tag: Tag, now_ms: f64) {
        self.inner.borrow_mut().exec_start.insert(tag, now_ms);
    }

    /// Note that the tuple with `tag` finished executing at `now_ms`,
    /// folding its execution time into the per-type average.
    pub fn execution_finished(&self, tag: Tag, tuple_type: &str, now_ms: f64) {
        let mut inner = self.inner.borrow_mut();
        let Some(start) = inner.exec_start.remove(&tag) else {
            return;
        };
        let (avg, count) = inner
            .exec_stats
            .entry(String::from(tuple_type))
            .or_insert((0.0, 0));
        *avg = (*avg * (*count as f64) + (now_ms - start)) / ((*count + 1) as f64);
        *count += 1;
    }

    /// Average execution time of tuples of the given type.
    #[must_use]
    pub fn execution_average(&self, tuple_type: &str) -> Option<f64> {
        self.inner
            .borrow()
            .exec_stats
            .get(tuple_type)
            .map(|s| s.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn emit_consumed_exactly_once() {
        let registry = LatencyRegistry::new();
        let lp = registry.new_loop_id();
        let id = registry.new_id();
        registry.record_emit(lp, id, 4.0);
        assert_eq!(registry.consume_emit(id), Some(4.0));
        assert_eq!(registry.consume_emit(id), None);
        assert_eq!(registry.emitted_count(lp), 1);
    }

    #[test]
    fn incremental_average_equals_arithmetic_mean() {
        let registry = LatencyRegistry::new();
        let lp = registry.new_loop_id();
        let delays = [3.0, 9.5, 0.25, 7.0, 1.5];
        for d in delays {
            registry.fold_sample(lp, d);
        }
        let mean: f64 = delays.iter().sum::<f64>() / delays.len() as f64;
        assert_abs_diff_eq!(registry.loop_average(lp).unwrap(), mean, epsilon = 1e-12);
        assert_eq!(registry.sample_count(lp), delays.len() as u64);
    }

    #[test]
    fn mean_is_order_independent() {
        let a = LatencyRegistry::new();
        let b = LatencyRegistry::new();
        let la = a.new_loop_id();
        let lb = b.new_loop_id();
        for d in [1.0, 2.0, 3.0, 4.0] {
            a.fold_sample(la, d);
        }
        for d in [4.0, 3.0, 2.0, 1.0] {
            b.fold_sample(lb, d);
        }
        assert_abs_diff_eq!(
            a.loop_average(la).unwrap(),
            b.loop_average(lb).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn execution_stats_per_tuple_type() {
        let registry = LatencyRegistry::new();
        registry.execution_started(Tag(5), 10.0);
        registry.execution_finished(Tag(5), "CAMERA", 14.0);
        registry.execution_started(Tag(6), 20.0);
        registry.execution_finished(Tag(6), "CAMERA", 26.0);
        assert_abs_diff_eq!(registry.execution_average("CAMERA").unwrap(), 5.0);

        // A finish with no matching start is discarded.
        registry.execution_finished(Tag(7), "CAMERA", 100.0);
        assert_abs_diff_eq!(registry.execution_average("CAMERA").unwrap(), 5.0);
    }
}
