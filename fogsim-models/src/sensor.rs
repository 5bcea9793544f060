// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Sensors inject tuples into the fog hierarchy through their gateway.

use std::sync::Arc;

use fogsim_components::distribution::Distribution;
use fogsim_engine::engine::Context;
use fogsim_engine::entity::SimEntity;
use fogsim_engine::types::{EntityId, SimResult};
use fogsim_track::entity::Entity;
use fogsim_track::{debug, trace};

use crate::application::Application;
use crate::events::FogEvent;
use crate::timekeeper::LatencyRegistry;
use crate::tuple::Tuple;

/// A tuple source attached to a gateway device.
///
/// The sensor stays silent until its application is activated, then emits
/// one tuple per sample of its transmit distribution.
pub struct Sensor {
    entity: Arc<Entity>,
    gateway: EntityId,
    gateway_latency_ms: f64,

    /// Inter-emission interval source.
    distribution: Box<dyn Distribution>,

    app_id: String,

    /// Tuple type of the application edge this sensor feeds.
    tuple_type: String,

    application: Option<Application>,
    active: bool,
    emitted: u64,
    registry: LatencyRegistry,
}

impl Sensor {
    /// Create a sensor feeding `tuple_type` into `gateway`.
    pub fn new(
        parent: &Arc<Entity>,
        name: &str,
        gateway: EntityId,
        gateway_latency_ms: f64,
        app_id: &str,
        tuple_type: &str,
        distribution: Box<dyn Distribution>,
        registry: LatencyRegistry,
    ) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, name)),
            gateway,
            gateway_latency_ms,
            distribution,
            app_id: String::from(app_id),
            tuple_type: String::from(tuple_type),
            application: None,
            active: false,
            emitted: 0,
            registry,
        }
    }

    /// Number of tuples emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn stamp_loop_timings(&self, now_ms: f64, app: &Application, tuple: &mut Tuple) {
        let Some(dest) = tuple.dest_module.as_deref() else {
            return;
        };
        for lp in &app.loops {
            if lp.starts_with_edge(&tuple.src_module, dest) {
                let id = self.registry.new_id();
                tuple.logical_id = Some(id);
                self.registry.record_emit(lp.loop_id, id, now_ms);
            }
        }
    }

    fn transmit(&mut self, ctx: &mut Context<FogEvent>) {
        let Some(app) = self.application.as_ref() else {
            return;
        };
        let Some(edge) = app.edge_by_tuple_type(&self.tuple_type) else {
            debug!(self.entity; "{} has no edge of type {}", self.app_id, self.tuple_type);
            return;
        };
        let mut tuple = app.create_tuple(&self.entity, edge, None);
        self.stamp_loop_timings(ctx.now_ms(), app, &mut tuple);
        trace!(self.entity; "emitting {}", tuple.tag);
        ctx.send(
            self.gateway,
            self.gateway_latency_ms,
            FogEvent::TupleArrival(tuple),
        );
        self.emitted += 1;
    }
}

impl SimEntity<FogEvent> for Sensor {
    fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    fn start(&mut self, ctx: &mut Context<FogEvent>) -> SimResult {
        ctx.send_now(
            self.gateway,
            FogEvent::SensorJoined {
                sensor: ctx.self_id(),
            },
        );
        Ok(())
    }

    fn process(
        &mut self,
        ctx: &mut Context<FogEvent>,
        _src: Option<EntityId>,
        event: FogEvent,
    ) -> SimResult {
        match event {
            FogEvent::AppSubmit(app) => {
                if app.app_id == self.app_id {
                    self.application = Some(app);
                }
            }
            FogEvent::ActiveAppUpdate { app_id } => {
                if app_id == self.app_id && !self.active {
                    self.active = true;
                    let delay_ms = self.distribution.next_value();
                    ctx.send_to_self(delay_ms, FogEvent::EmitTuple);
                }
            }
            FogEvent::EmitTuple => {
                self.transmit(ctx);
                let delay_ms = self.distribution.next_value();
                ctx.send_to_self(delay_ms, FogEvent::EmitTuple);
            }
            FogEvent::TupleAck => {}
            other => {
                trace!(self.entity; "ignoring {other:?}");
            }
        }
        Ok(())
    }
}
