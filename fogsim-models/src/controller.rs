// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The controller distributes application definitions and module
//! placements at start of day, then counts completed sink tuples.

use std::sync::Arc;

use fogsim_engine::engine::Context;
use fogsim_engine::entity::SimEntity;
use fogsim_engine::types::{EntityId, SimResult};
use fogsim_track::entity::Entity;
use fogsim_track::{info, trace};
use itertools::Itertools;

use crate::application::Application;
use crate::events::FogEvent;

/// Static placement of application modules onto devices.
#[derive(Clone, Debug, Default)]
pub struct ModuleMapping {
    placements: Vec<(EntityId, String, usize)>,
}

impl ModuleMapping {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place one instance of `module_name` on `device`.
    pub fn map(&mut self, device: EntityId, module_name: &str) {
        self.map_instances(device, module_name, 1);
    }

    /// Place `module_name` on `device` with a desired replica count.
    pub fn map_instances(&mut self, device: EntityId, module_name: &str, instances: usize) {
        self.placements
            .push((device, String::from(module_name), instances));
    }
}

/// Orchestrates application launch across the topology.
pub struct Controller {
    entity: Arc<Entity>,
    devices: Vec<EntityId>,
    sensors: Vec<EntityId>,
    actuators: Vec<EntityId>,
    submissions: Vec<(Application, ModuleMapping)>,
    tuples_finished: u64,
}

impl Controller {
    /// Create a controller over the given topology members.
    pub fn new(
        parent: &Arc<Entity>,
        name: &str,
        devices: Vec<EntityId>,
        sensors: Vec<EntityId>,
        actuators: Vec<EntityId>,
    ) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, name)),
            devices,
            sensors,
            actuators,
            submissions: Vec::new(),
            tuples_finished: 0,
        }
    }

    /// Queue an application and its module placement for launch.
    pub fn submit_application(&mut self, app: Application, mapping: ModuleMapping) {
        self.submissions.push((app, mapping));
    }

    /// Number of sink tuples the root reported as finished.
    #[must_use]
    pub fn tuples_finished(&self) -> u64 {
        self.tuples_finished
    }
}

impl SimEntity<FogEvent> for Controller {
    fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    fn start(&mut self, ctx: &mut Context<FogEvent>) -> SimResult {
        for (app, mapping) in &self.submissions {
            info!(self.entity; "launching {} across {}", app.app_id,
                self.devices.iter().map(|d| d.to_string()).join(", "));

            let members = self
                .devices
                .iter()
                .chain(self.sensors.iter())
                .chain(self.actuators.iter());
            for member in members {
                ctx.send_now(*member, FogEvent::AppSubmit(app.clone()));
                ctx.send_now(
                    *member,
                    FogEvent::ActiveAppUpdate {
                        app_id: app.app_id.clone(),
                    },
                );
            }

            for (device, module_name, instances) in &mapping.placements {
                ctx.send_now(
                    *device,
                    FogEvent::LaunchModule {
                        app_id: app.app_id.clone(),
                        module_name: module_name.clone(),
                    },
                );
                if *instances > 1 {
                    ctx.send_now(
                        *device,
                        FogEvent::LaunchModuleInstance {
                            app_id: app.app_id.clone(),
                            module_name: module_name.clone(),
                            instance_count: *instances,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        _ctx: &mut Context<FogEvent>,
        _src: Option<EntityId>,
        event: FogEvent,
    ) -> SimResult {
        match event {
            FogEvent::TupleFinished => {
                self.tuples_finished += 1;
            }
            FogEvent::TupleAck => {}
            other => {
                trace!(self.entity; "ignoring {other:?}");
            }
        }
        Ok(())
    }
}
