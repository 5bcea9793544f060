// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The discrete-event engine.
//!
//! Events are held in a priority queue ordered by `(time, sequence)`:
//! earlier times first, and at equal times submission order. The sequence
//! tie-break makes every run bit-reproducible, which matters for link-queue
//! draining and tuple delivery ordering.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use fogsim_track::entity::{Entity, toplevel};
use fogsim_track::tracker::stdout_tracker;
use fogsim_track::{Tracker, set_time};

use crate::config::SimConfig;
use crate::entity::SimEntity;
use crate::sim_error;
use crate::types::{EntityId, SimError, SimResult};

struct ScheduledEvent<E> {
    time_ms: f64,
    seq: u64,
    src: Option<EntityId>,
    dest: EntityId,
    event: E,
}

impl<E> PartialEq for ScheduledEvent<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time_ms == other.time_ms && self.seq == other.seq
    }
}

impl<E> Eq for ScheduledEvent<E> {}

impl<E> PartialOrd for ScheduledEvent<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for ScheduledEvent<E> {
    // Reversed so that the earliest (time, seq) is at the top of the
    // max-heap. seq values are unique, so this is a total order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time_ms
            .total_cmp(&self.time_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Handle given to an entity while it processes an event.
///
/// All sends are buffered and enqueued after the handler returns, in the
/// order they were issued.
pub struct Context<'a, E> {
    self_id: EntityId,
    now_ms: f64,
    min_event_gap_ms: f64,
    resource_mgmt_interval_ms: f64,
    outgoing: &'a mut Vec<(f64, EntityId, E)>,
}

impl<E> Context<'_, E> {
    /// The current simulated time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// The id of the entity this context was handed to.
    #[must_use]
    pub fn self_id(&self) -> EntityId {
        self.self_id
    }

    /// The smallest send delay the engine supports.
    #[must_use]
    pub fn min_event_gap_ms(&self) -> f64 {
        self.min_event_gap_ms
    }

    /// The configured resource management interval.
    #[must_use]
    pub fn resource_mgmt_interval_ms(&self) -> f64 {
        self.resource_mgmt_interval_ms
    }

    /// Schedule `event` for delivery to `dest` after `delay_ms`.
    pub fn send(&mut self, dest: EntityId, delay_ms: f64, event: E) {
        assert!(delay_ms >= 0.0, "negative event delay");
        self.outgoing.push((self.now_ms + delay_ms, dest, event));
    }

    /// Schedule `event` for delivery to `dest` after the minimum event gap.
    pub fn send_now(&mut self, dest: EntityId, event: E) {
        let gap = self.min_event_gap_ms;
        self.send(dest, gap, event);
    }

    /// Schedule `event` back to the issuing entity after `delay_ms`.
    pub fn send_to_self(&mut self, delay_ms: f64, event: E) {
        let dest = self.self_id;
        self.send(dest, delay_ms, event);
    }
}

/// The simulation engine: an entity registry plus the event queue.
pub struct Engine<E> {
    entities: Vec<Option<Box<dyn SimEntity<E>>>>,
    queue: BinaryHeap<ScheduledEvent<E>>,
    now_ms: f64,
    next_seq: u64,
    started: bool,
    config: SimConfig,
    toplevel: Arc<Entity>,
    tracker: Tracker,
}

impl<E: 'static> Engine<E> {
    /// Create a standalone engine with the default configuration.
    #[must_use]
    pub fn new(tracker: &Tracker) -> Self {
        Self::with_config(tracker, SimConfig::default())
    }

    /// Create an engine with an explicit [`SimConfig`].
    #[must_use]
    pub fn with_config(tracker: &Tracker, config: SimConfig) -> Self {
        let toplevel = toplevel(tracker, "top");
        Self {
            entities: Vec::new(),
            queue: BinaryHeap::new(),
            now_ms: 0.0,
            next_seq: 0,
            started: false,
            config,
            toplevel,
            tracker: tracker.clone(),
        }
    }

    /// Register an entity and return the id events can be addressed to.
    pub fn add_entity(&mut self, entity: Box<dyn SimEntity<E>>) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(Some(entity));
        id
    }

    /// Inject an event from outside the simulation.
    pub fn schedule(&mut self, dest: EntityId, delay_ms: f64, event: E) {
        assert!(delay_ms >= 0.0, "negative event delay");
        let time_ms = self.now_ms + delay_ms;
        self.push(time_ms, None, dest, event);
    }

    fn push(&mut self, time_ms: f64, src: Option<EntityId>, dest: EntityId, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent {
            time_ms,
            seq,
            src,
            dest,
            event,
        });
    }

    fn start_all(&mut self) -> SimResult {
        let mut idx = 0;
        while idx < self.entities.len() {
            let Some(mut entity) = self.entities[idx].take() else {
                return Err(SimError(format!("entity {idx} missing during start")));
            };
            let mut outgoing = Vec::new();
            let result = {
                let mut ctx = self.context(EntityId(idx), &mut outgoing);
                entity.start(&mut ctx)
            };
            self.entities[idx] = Some(entity);
            for (time_ms, dest, event) in outgoing {
                self.push(time_ms, Some(EntityId(idx)), dest, event);
            }
            result?;
            idx += 1;
        }
        self.started = true;
        Ok(())
    }

    fn context<'a>(
        &self,
        self_id: EntityId,
        outgoing: &'a mut Vec<(f64, EntityId, E)>,
    ) -> Context<'a, E> {
        Context {
            self_id,
            now_ms: self.now_ms,
            min_event_gap_ms: self.config.min_event_gap_ms,
            resource_mgmt_interval_ms: self.config.resource_mgmt_interval_ms,
            outgoing,
        }
    }

    fn dispatch(&mut self, ev: ScheduledEvent<E>) -> SimResult {
        if ev.time_ms > self.now_ms {
            self.now_ms = ev.time_ms;
            set_time!(self.toplevel; self.now_ms);
        }

        let idx = ev.dest.0;
        if idx >= self.entities.len() {
            sim_error!(format!("event addressed to unknown entity {}", ev.dest));
        }
        let Some(mut entity) = self.entities[idx].take() else {
            return Err(SimError(format!("entity {} is not available", ev.dest)));
        };

        let mut outgoing = Vec::new();
        let result = {
            let mut ctx = self.context(ev.dest, &mut outgoing);
            entity.process(&mut ctx, ev.src, ev.event)
        };
        self.entities[idx] = Some(entity);
        for (time_ms, dest, event) in outgoing {
            self.push(time_ms, Some(ev.dest), dest, event);
        }
        result
    }

    /// Run until the event queue is empty.
    pub fn run(&mut self) -> SimResult {
        if !self.started {
            self.start_all()?;
        }
        while let Some(ev) = self.queue.pop() {
            self.dispatch(ev)?;
        }
        Ok(())
    }

    /// Run until the simulated time reaches `until_ms`.
    ///
    /// Events scheduled beyond `until_ms` stay queued; the clock is left at
    /// `until_ms` so a later `run_until` continues from there.
    pub fn run_until(&mut self, until_ms: f64) -> SimResult {
        if !self.started {
            self.start_all()?;
        }
        while let Some(head) = self.queue.peek() {
            if head.time_ms > until_ms {
                break;
            }
            let ev = self.queue.pop().unwrap();
            self.dispatch(ev)?;
        }
        if self.now_ms < until_ms {
            self.now_ms = until_ms;
            set_time!(self.toplevel; self.now_ms);
        }
        Ok(())
    }

    /// The current simulated time in milliseconds.
    #[must_use]
    pub fn time_now_ms(&self) -> f64 {
        self.now_ms
    }

    /// The top-level track entity.
    #[must_use]
    pub fn top(&self) -> &Arc<Entity> {
        &self.toplevel
    }

    /// The tracker shared by every entity in this engine.
    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Borrow a registered entity as its concrete type.
    ///
    /// Returns `None` if the id is unknown or the type does not match.
    #[must_use]
    pub fn entity_ref<T: 'static>(&self, id: EntityId) -> Option<&T> {
        let entity = self.entities.get(id.0)?.as_ref()?;
        (entity.as_ref() as &dyn Any).downcast_ref::<T>()
    }
}

/// Create a default engine that sends [`Track`](fogsim_track::Track) events to
/// stdout.
///
/// This is provided to keep documentation examples simple with fewer
/// concepts to have to consider at once.
impl<E: 'static> Default for Engine<E> {
    fn default() -> Self {
        let tracker = stdout_tracker();
        Self::new(&tracker)
    }
}
