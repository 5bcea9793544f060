// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A bandwidth-limited transmission channel with a fixed latency.
//!
//! The link is a `Free` ⇄ `Busy` state machine with a FIFO of waiting
//! items. At most one item occupies the wire at a time; its transfer time
//! is `size / bandwidth` and delivery at the far end happens a further
//! fixed latency after the transfer completes.
//!
//! The link does not schedule anything itself. The owner calls
//! [`offer`](Link::offer) when it has an item to send and
//! [`release`](Link::release) when the transfer-complete event it scheduled
//! fires; both return the [`Dispatch`] describing what to schedule next.

use std::collections::VecDeque;
use std::sync::Arc;

use fogsim_track::entity::Entity;
use fogsim_track::tag::Tagged;
use fogsim_track::{enter, exit, trace};

use crate::traits::TotalBytes;

/// An item leaving the link, with the delays the owner must schedule.
#[derive(Debug)]
pub struct Dispatch<T> {
    /// The item now occupying the wire.
    pub item: T,

    /// Time until the wire is free again.
    pub transfer_ms: f64,

    /// Time until the item arrives at the far end
    /// (`transfer_ms` plus the link latency).
    pub delivery_ms: f64,
}

/// A single-direction link.
pub struct Link<T: TotalBytes + Tagged> {
    entity: Arc<Entity>,

    /// Bandwidth in bytes per millisecond.
    bandwidth: f64,

    /// Fixed propagation latency in milliseconds.
    latency_ms: f64,

    busy: bool,

    fifo: VecDeque<T>,
}

impl<T: TotalBytes + Tagged> Link<T> {
    /// Create a link below `parent` in the entity hierarchy.
    ///
    /// # Panics
    ///
    /// Panics if `bandwidth` is not positive.
    #[must_use]
    pub fn new(parent: &Arc<Entity>, name: &str, bandwidth: f64, latency_ms: f64) -> Self {
        assert!(bandwidth > 0.0, "link bandwidth must be positive");
        assert!(latency_ms >= 0.0, "link latency must be non-negative");
        Self {
            entity: Arc::new(Entity::new(parent, name)),
            bandwidth,
            latency_ms,
            busy: false,
            fifo: VecDeque::new(),
        }
    }

    fn dispatch(&mut self, item: T) -> Dispatch<T> {
        let transfer_ms = item.total_bytes() as f64 / self.bandwidth;
        exit!(self.entity; item.tag());
        trace!(self.entity; "sending {} for {transfer_ms}ms", item.tag());
        Dispatch {
            item,
            transfer_ms,
            delivery_ms: transfer_ms + self.latency_ms,
        }
    }

    /// Offer an item for transmission.
    ///
    /// Returns the [`Dispatch`] if the wire was free; `None` if the item
    /// was queued behind the one in flight.
    pub fn offer(&mut self, item: T) -> Option<Dispatch<T>> {
        enter!(self.entity; item.tag());
        if self.busy {
            trace!(self.entity; "busy, queueing {} at depth {}", item.tag(), self.fifo.len());
            self.fifo.push_back(item);
            return None;
        }
        self.busy = true;
        Some(self.dispatch(item))
    }

    /// Report that the in-flight transfer has completed.
    ///
    /// Returns the next queued item's [`Dispatch`], or `None` if the queue
    /// was empty and the link is now free.
    pub fn release(&mut self) -> Option<Dispatch<T>> {
        debug_assert!(self.busy);
        match self.fifo.pop_front() {
            Some(item) => Some(self.dispatch(item)),
            None => {
                self.busy = false;
                None
            }
        }
    }

    /// Whether a transfer is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Number of items waiting behind the one in flight.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.fifo.len()
    }

    /// The fixed propagation latency.
    #[must_use]
    pub fn latency_ms(&self) -> f64 {
        self.latency_ms
    }
}

#[cfg(test)]
mod tests {
    use fogsim_track::entity::toplevel;
    use fogsim_track::tracker::dev_null_tracker;

    use super::*;

    fn new_link(bandwidth: f64, latency_ms: f64) -> Link<usize> {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        Link::new(&top, "uplink", bandwidth, latency_ms)
    }

    #[test]
    fn free_link_dispatches_immediately() {
        let mut link = new_link(1000.0, 2.0);
        let dispatch = link.offer(500).unwrap();
        assert_eq!(dispatch.item, 500);
        assert_eq!(dispatch.transfer_ms, 0.5);
        assert_eq!(dispatch.delivery_ms, 2.5);
        assert!(link.is_busy());
    }

    #[test]
    fn busy_link_queues_in_fifo_order() {
        let mut link = new_link(1000.0, 2.0);
        assert!(link.offer(500).is_some());
        assert!(link.offer(300).is_none());
        assert!(link.offer(100).is_none());
        assert_eq!(link.queue_len(), 2);

        let second = link.release().unwrap();
        assert_eq!(second.item, 300);
        assert_eq!(second.transfer_ms, 0.3);
        assert!(link.is_busy());

        let third = link.release().unwrap();
        assert_eq!(third.item, 100);

        assert!(link.release().is_none());
        assert!(!link.is_busy());
        assert_eq!(link.queue_len(), 0);
    }

    #[test]
    fn link_frees_after_last_transfer() {
        let mut link = new_link(100.0, 0.0);
        assert!(link.offer(50).is_some());
        assert!(link.release().is_none());
        // A new offer after the wire freed goes straight out again.
        assert!(link.offer(10).is_some());
    }

    #[test]
    #[should_panic(expected = "bandwidth must be positive")]
    fn zero_bandwidth_rejected() {
        new_link(0.0, 1.0);
    }
}
