// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Actuators terminate control loops at the edge of the hierarchy.

use std::sync::Arc;

use fogsim_engine::engine::Context;
use fogsim_engine::entity::SimEntity;
use fogsim_engine::types::{EntityId, SimResult};
use fogsim_track::entity::Entity;
use fogsim_track::{destroy_tag, trace};

use crate::application::Application;
use crate::events::FogEvent;
use crate::timekeeper::LatencyRegistry;
use crate::tuple::Tuple;

/// A tuple sink attached to a gateway device.
///
/// Tuples whose destination matches this actuator's type are delivered
/// here; the actuator closes any control loop ending at its type and
/// consumes the tuple.
pub struct Actuator {
    entity: Arc<Entity>,
    gateway: EntityId,
    gateway_latency_ms: f64,
    actuator_type: String,
    app_id: String,
    application: Option<Application>,
    received: u64,
    registry: LatencyRegistry,
}

impl Actuator {
    /// Create an actuator of `actuator_type` below `gateway`.
    pub fn new(
        parent: &Arc<Entity>,
        name: &str,
        gateway: EntityId,
        gateway_latency_ms: f64,
        app_id: &str,
        actuator_type: &str,
        registry: LatencyRegistry,
    ) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, name)),
            gateway,
            gateway_latency_ms,
            actuator_type: String::from(actuator_type),
            app_id: String::from(app_id),
            application: None,
            received: 0,
            registry,
        }
    }

    /// Number of tuples delivered to this actuator.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    fn close_loops(&self, now_ms: f64, tuple: &Tuple) {
        let Some(app) = self.application.as_ref() else {
            return;
        };
        for lp in &app.loops {
            if lp.ends_with_edge(&tuple.src_module, &self.actuator_type) {
                let Some(id) = tuple.logical_id else {
                    break;
                };
                let Some(start) = self.registry.consume_emit(id) else {
                    break;
                };
                self.registry.fold_sample(lp.loop_id, now_ms - start);
                break;
            }
        }
    }
}

impl SimEntity<FogEvent> for Actuator {
    fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    fn start(&mut self, ctx: &mut Context<FogEvent>) -> SimResult {
        ctx.send_now(
            self.gateway,
            FogEvent::ActuatorJoined {
                actuator: ctx.self_id(),
                actuator_type: self.actuator_type.clone(),
                latency_ms: self.gateway_latency_ms,
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
            FogEvent::TupleArrival(tuple) => {
                trace!(self.entity; "actuating on {}", tuple.tag);
                self.close_loops(ctx.now_ms(), &tuple);
                self.received += 1;
                destroy_tag!(self.entity; tuple.tag);
            }
            FogEvent::AppSubmit(app) => {
                if app.app_id == self.app_id {
                    self.application = Some(app);
                }
            }
            FogEvent::TupleAck | FogEvent::ActiveAppUpdate { .. } => {}
            other => {
                trace!(self.entity; "ignoring {other:?}");
            }
        }
        Ok(())
    }
}
