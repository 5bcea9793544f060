// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Network usage accounting shared across devices.

use std::cell::RefCell;
use std::rc::Rc;

/// Accumulates link usage (latency times bytes) across every device that
/// holds a clone of the handle.
#[derive(Clone, Default)]
pub struct NetworkMonitor {
    usage: Rc<RefCell<f64>>,
}

impl NetworkMonitor {
    /// Create a monitor with zero recorded usage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tuple going onto a link.
    pub fn record(&self, latency_ms: f64, size_bytes: usize) {
        *self.usage.borrow_mut() += latency_ms * size_bytes as f64;
    }

    /// Total usage recorded so far.
    #[must_use]
    pub fn total_usage(&self) -> f64 {
        *self.usage.borrow()
    }
}
