// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The FOGSIM discrete-event engine.
//!
//! The engine owns a registry of [`SimEntity`](crate::entity::SimEntity)
//! implementations and a stable priority queue of timed events. Each event
//! carries a destination [`EntityId`](crate::types::EntityId); delivery
//! invokes the destination's handler with a [`Context`](crate::engine::Context)
//! through which further events are scheduled. Events at the same timestamp
//! are dispatched in submission order, so runs are deterministic.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use fogsim_engine::engine::{Context, Engine};
//! use fogsim_engine::entity::SimEntity;
//! use fogsim_engine::types::{EntityId, SimResult};
//! use fogsim_track::entity::Entity;
//! use fogsim_track::tracker::dev_null_tracker;
//!
//! struct Counter {
//!     entity: Arc<Entity>,
//!     seen: usize,
//! }
//!
//! impl SimEntity<u32> for Counter {
//!     fn entity(&self) -> &Arc<Entity> {
//!         &self.entity
//!     }
//!
//!     fn process(&mut self, _ctx: &mut Context<u32>, _src: Option<EntityId>, _event: u32) -> SimResult {
//!         self.seen += 1;
//!         Ok(())
//!     }
//! }
//!
//! let tracker = dev_null_tracker();
//! let mut engine: Engine<u32> = Engine::new(&tracker);
//! let entity = Arc::new(Entity::new(engine.top(), "counter"));
//! let id = engine.add_entity(Box::new(Counter { entity, seen: 0 }));
//! engine.schedule(id, 5.0, 7);
//! engine.run().unwrap();
//! assert_eq!(engine.time_now_ms(), 5.0);
//! assert_eq!(engine.entity_ref::<Counter>(id).unwrap().seen, 1);
//! ```

// Enable warnings for missing documentation
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod entity;
pub mod test_helpers;
pub mod types;
