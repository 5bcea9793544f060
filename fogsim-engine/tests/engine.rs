// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::sync::Arc;

use fogsim_engine::engine::{Context, Engine};
use fogsim_engine::entity::SimEntity;
use fogsim_engine::test_helpers::start_test;
use fogsim_engine::types::{EntityId, SimResult};
use fogsim_track::entity::Entity;

/// Records every delivery with its timestamp and payload.
struct Recorder {
    entity: Arc<Entity>,
    deliveries: Vec<(f64, u32)>,
}

impl Recorder {
    fn new(top: &Arc<Entity>, name: &str) -> Self {
        Self {
            entity: Arc::new(Entity::new(top, name)),
            deliveries: Vec::new(),
        }
    }
}

impl SimEntity<u32> for Recorder {
    fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    fn process(&mut self, ctx: &mut Context<u32>, _src: Option<EntityId>, event: u32) -> SimResult {
        self.deliveries.push((ctx.now_ms(), event));
        Ok(())
    }
}

/// Replies to every delivery until the payload counts down to zero.
struct PingPong {
    entity: Arc<Entity>,
    peer: Option<EntityId>,
    bounces: usize,
}

impl SimEntity<u32> for PingPong {
    fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    fn process(&mut self, ctx: &mut Context<u32>, _src: Option<EntityId>, event: u32) -> SimResult {
        self.bounces += 1;
        if event > 0 {
            if let Some(peer) = self.peer {
                ctx.send(peer, 1.0, event - 1);
            }
        }
        Ok(())
    }
}

#[test]
fn delivers_in_time_order() {
    let mut engine: Engine<u32> = start_test(file!());
    let top = engine.top().clone();
    let id = engine.add_entity(Box::new(Recorder::new(&top, "recorder")));

    engine.schedule(id, 10.0, 1);
    engine.schedule(id, 2.0, 2);
    engine.schedule(id, 7.5, 3);
    engine.run().unwrap();

    let recorder = engine.entity_ref::<Recorder>(id).unwrap();
    assert_eq!(
        recorder.deliveries,
        vec![(2.0, 2), (7.5, 3), (10.0, 1)]
    );
    assert_eq!(engine.time_now_ms(), 10.0);
}

#[test]
fn same_timestamp_keeps_submission_order() {
    let mut engine: Engine<u32> = start_test(file!());
    let top = engine.top().clone();
    let id = engine.add_entity(Box::new(Recorder::new(&top, "recorder")));

    for payload in 0..8 {
        engine.schedule(id, 5.0, payload);
    }
    engine.run().unwrap();

    let recorder = engine.entity_ref::<Recorder>(id).unwrap();
    let payloads: Vec<u32> = recorder.deliveries.iter().map(|d| d.1).collect();
    assert_eq!(payloads, (0..8).collect::<Vec<u32>>());
}

#[test]
fn ping_pong_until_exhausted() {
    let mut engine: Engine<u32> = start_test(file!());
    let top = engine.top().clone();
    // Ids are assigned densely in registration order.
    let ping = engine.add_entity(Box::new(PingPong {
        entity: Arc::new(Entity::new(&top, "ping")),
        peer: Some(EntityId(1)),
        bounces: 0,
    }));
    let pong = engine.add_entity(Box::new(PingPong {
        entity: Arc::new(Entity::new(&top, "pong")),
        peer: Some(ping),
        bounces: 0,
    }));

    engine.schedule(pong, 0.0, 4);
    engine.run().unwrap();

    // pong sees 4, 2, 0; ping sees 3, 1.
    assert_eq!(engine.entity_ref::<PingPong>(pong).unwrap().bounces, 3);
    assert_eq!(engine.entity_ref::<PingPong>(ping).unwrap().bounces, 2);
    assert_eq!(engine.time_now_ms(), 4.0);
}

#[test]
fn run_until_leaves_later_events_queued() {
    let mut engine: Engine<u32> = start_test(file!());
    let top = engine.top().clone();
    let id = engine.add_entity(Box::new(Recorder::new(&top, "recorder")));

    engine.schedule(id, 3.0, 1);
    engine.schedule(id, 30.0, 2);

    engine.run_until(10.0).unwrap();
    assert_eq!(engine.time_now_ms(), 10.0);
    assert_eq!(engine.entity_ref::<Recorder>(id).unwrap().deliveries.len(), 1);

    engine.run().unwrap();
    assert_eq!(engine.time_now_ms(), 30.0);
    assert_eq!(engine.entity_ref::<Recorder>(id).unwrap().deliveries.len(), 2);
}

#[test]
fn unknown_destination_is_an_error() {
    let mut engine: Engine<u32> = start_test(file!());
    engine.schedule(EntityId(99), 1.0, 0);
    assert!(engine.run().is_err());
}

#[test]
fn entity_ref_rejects_wrong_type() {
    let mut engine: Engine<u32> = start_test(file!());
    let top = engine.top().clone();
    let id = engine.add_entity(Box::new(Recorder::new(&top, "recorder")));
    engine.run().unwrap();

    assert!(engine.entity_ref::<Recorder>(id).is_some());
    assert!(engine.entity_ref::<PingPong>(id).is_none());
}
