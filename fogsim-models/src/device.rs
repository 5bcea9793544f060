// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A fog device: the per-node routing and resource-scheduling engine.
//!
//! Each device owns one uplink, one downlink per child and one link per
//! peer, a set of hosted module instances, and the energy/cost
//! accounting for its host. Tuples arriving by [`FogEvent::TupleArrival`]
//! are either executed locally, queued on a link, or delivered to an
//! attached actuator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fogsim_components::link::{Dispatch, Link};
use fogsim_components::power::PowerModel;
use fogsim_engine::engine::Context;
use fogsim_engine::entity::SimEntity;
use fogsim_engine::sim_error;
use fogsim_engine::types::{EntityId, SimResult};
use fogsim_track::entity::Entity;
use fogsim_track::{debug, destroy_tag, info, trace, warn};

use crate::application::Application;
use crate::events::FogEvent;
use crate::module::AppModule;
use crate::monitor::NetworkMonitor;
use crate::timekeeper::LatencyRegistry;
use crate::tuple::{Direction, Tuple};

/// Static host parameters of a device.
#[derive(Clone, Debug)]
pub struct DeviceParams {
    /// Total compute capacity in MIPS.
    pub mips: f64,

    /// Uplink bandwidth in bytes per millisecond.
    pub uplink_bw: f64,

    /// Downlink bandwidth in bytes per millisecond.
    pub downlink_bw: f64,

    /// Usage cost rate per MIPS-second.
    pub rate_per_mips: f64,
}

/// A compute node in the fog hierarchy.
pub struct FogDevice {
    entity: Arc<Entity>,
    params: DeviceParams,

    /// Uplink to the parent; `None` at the topology root.
    uplink: Option<(EntityId, Link<Tuple>)>,
    controller: Option<EntityId>,
    children: Vec<EntityId>,
    downlinks: HashMap<EntityId, Link<Tuple>>,
    peers: Vec<EntityId>,
    peer_links: HashMap<EntityId, Link<Tuple>>,

    /// (actuator, type, delivery delay) associations.
    actuators: Vec<(EntityId, String, f64)>,
    sensors: Vec<EntityId>,

    applications: HashMap<String, Application>,
    active_apps: HashSet<String>,

    /// Application id to the module names hosted here.
    app_to_modules: HashMap<String, HashSet<String>>,
    modules: Vec<AppModule>,

    /// Desired replica counts recorded by LaunchModuleInstance.
    instance_targets: HashMap<(String, String), usize>,

    power_model: Box<dyn PowerModel>,
    energy_ws: f64,
    total_cost: f64,
    last_utilization: f64,
    last_util_update_ms: f64,

    /// Earliest outstanding ExecutionUpdate, to avoid duplicate wakeups.
    exec_update_pending: Option<f64>,

    /// Arrivals per one-second bucket, kept at the root only.
    cloud_traffic: HashMap<u64, u64>,

    registry: LatencyRegistry,
    monitor: NetworkMonitor,
}

impl FogDevice {
    /// Create a device below `parent` in the entity hierarchy.
    ///
    /// Fails fast if the host has no compute capacity; a zero-MIPS device
    /// is a scenario configuration error.
    pub fn new(
        parent: &Arc<Entity>,
        name: &str,
        params: DeviceParams,
        power_model: Box<dyn PowerModel>,
        registry: LatencyRegistry,
        monitor: NetworkMonitor,
    ) -> Result<Self, fogsim_engine::types::SimError> {
        if params.mips <= 0.0 {
            sim_error!(format!("device {name} configured with no processing capacity"));
        }
        Ok(Self {
            entity: Arc::new(Entity::new(parent, name)),
            params,
            uplink: None,
            controller: None,
            children: Vec::new(),
            downlinks: HashMap::new(),
            peers: Vec::new(),
            peer_links: HashMap::new(),
            actuators: Vec::new(),
            sensors: Vec::new(),
            applications: HashMap::new(),
            active_apps: HashSet::new(),
            app_to_modules: HashMap::new(),
            modules: Vec::new(),
            instance_targets: HashMap::new(),
            power_model,
            energy_ws: 0.0,
            total_cost: 0.0,
            last_utilization: 0.0,
            last_util_update_ms: 0.0,
            exec_update_pending: None,
            cloud_traffic: HashMap::new(),
            registry,
            monitor,
        })
    }

    /// Attach this device below `parent` with the given uplink latency.
    pub fn set_parent(&mut self, parent: EntityId, latency_ms: f64) {
        let link = Link::new(&self.entity, "uplink", self.params.uplink_bw, latency_ms);
        self.uplink = Some((parent, link));
    }

    /// Set the controller notified of finished sink tuples.
    pub fn set_controller(&mut self, controller: EntityId) {
        self.controller = Some(controller);
    }

    /// Register a child and its downlink latency.
    pub fn add_child(&mut self, child: EntityId, latency_ms: f64) {
        let name = format!("downlink{}", self.children.len());
        let link = Link::new(&self.entity, &name, self.params.downlink_bw, latency_ms);
        self.children.push(child);
        self.downlinks.insert(child, link);
    }

    /// Register a peer and its link latency. Peer links carry the uplink
    /// bandwidth and discipline, one independent queue per peer.
    pub fn add_peer(&mut self, peer: EntityId, latency_ms: f64) {
        let name = format!("peerlink{}", self.peers.len());
        let link = Link::new(&self.entity, &name, self.params.uplink_bw, latency_ms);
        self.peers.push(peer);
        self.peer_links.insert(peer, link);
    }

    /// Whether this device is the topology root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.uplink.is_none()
    }

    /// Accumulated energy in watt-seconds.
    #[must_use]
    pub fn energy_ws(&self) -> f64 {
        self.energy_ws
    }

    /// Accumulated usage cost.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Utilization at the last accounting snapshot.
    #[must_use]
    pub fn last_utilization(&self) -> f64 {
        self.last_utilization
    }

    /// Arrivals per one-second bucket, tracked at the root.
    #[must_use]
    pub fn cloud_traffic(&self) -> &HashMap<u64, u64> {
        &self.cloud_traffic
    }

    /// The hosted instance of `module_name` for `app_id`, if any.
    #[must_use]
    pub fn module(&self, app_id: &str, module_name: &str) -> Option<&AppModule> {
        self.module_index(app_id, module_name).map(|i| &self.modules[i])
    }

    /// Desired replica count recorded for a module.
    #[must_use]
    pub fn instance_target(&self, app_id: &str, module_name: &str) -> Option<usize> {
        self.instance_targets
            .get(&(String::from(app_id), String::from(module_name)))
            .copied()
    }

    fn module_index(&self, app_id: &str, module_name: &str) -> Option<usize> {
        self.modules
            .iter()
            .position(|m| m.app_id == app_id && m.name == module_name)
    }

    fn update_cloud_traffic(&mut self, now_ms: f64) {
        let bucket = (now_ms / 1000.0) as u64;
        *self.cloud_traffic.entry(bucket).or_insert(0) += 1;
    }

    // Link handling

    fn dispatch_up(&mut self, ctx: &mut Context<FogEvent>, parent: EntityId, d: Dispatch<Tuple>) {
        self.monitor
            .record(d.delivery_ms - d.transfer_ms, d.item.size_bytes);
        ctx.send_to_self(d.transfer_ms, FogEvent::NorthLinkFree);
        ctx.send(parent, d.delivery_ms, FogEvent::TupleArrival(d.item));
    }

    fn dispatch_down(&mut self, ctx: &mut Context<FogEvent>, child: EntityId, d: Dispatch<Tuple>) {
        self.monitor
            .record(d.delivery_ms - d.transfer_ms, d.item.size_bytes);
        ctx.send_to_self(d.transfer_ms, FogEvent::SouthLinkFree { child });
        ctx.send(child, d.delivery_ms, FogEvent::TupleArrival(d.item));
    }

    fn dispatch_peer(&mut self, ctx: &mut Context<FogEvent>, peer: EntityId, d: Dispatch<Tuple>) {
        self.monitor
            .record(d.delivery_ms - d.transfer_ms, d.item.size_bytes);
        ctx.send_to_self(d.transfer_ms, FogEvent::PeerLinkFree { peer });
        ctx.send(peer, d.delivery_ms, FogEvent::TupleArrival(d.item));
    }

    fn send_up(&mut self, ctx: &mut Context<FogEvent>, tuple: Tuple) {
        let Some((parent, link)) = self.uplink.as_mut() else {
            trace!(self.entity; "no parent for {}, dropping", tuple.tag);
            destroy_tag!(self.entity; tuple.tag);
            return;
        };
        let parent = *parent;
        if let Some(d) = link.offer(tuple) {
            self.dispatch_up(ctx, parent, d);
        }
    }

    fn send_down(&mut self, ctx: &mut Context<FogEvent>, child: EntityId, tuple: Tuple) {
        let Some(link) = self.downlinks.get_mut(&child) else {
            warn!(self.entity; "no downlink to child {child}");
            return;
        };
        if let Some(d) = link.offer(tuple) {
            self.dispatch_down(ctx, child, d);
        }
    }

    fn send_peer(&mut self, ctx: &mut Context<FogEvent>, peer: EntityId, tuple: Tuple) {
        let Some(link) = self.peer_links.get_mut(&peer) else {
            warn!(self.entity; "no link to peer {peer}");
            return;
        };
        if let Some(d) = link.offer(tuple) {
            self.dispatch_peer(ctx, peer, d);
        }
    }

    fn north_link_free(&mut self, ctx: &mut Context<FogEvent>) {
        if let Some((parent, link)) = self.uplink.as_mut() {
            let parent = *parent;
            if let Some(d) = link.release() {
                self.dispatch_up(ctx, parent, d);
            }
        }
    }

    fn south_link_free(&mut self, ctx: &mut Context<FogEvent>, child: EntityId) {
        if let Some(link) = self.downlinks.get_mut(&child) {
            if let Some(d) = link.release() {
                self.dispatch_down(ctx, child, d);
            }
        }
    }

    fn peer_link_free(&mut self, ctx: &mut Context<FogEvent>, peer: EntityId) {
        if let Some(link) = self.peer_links.get_mut(&peer) {
            if let Some(d) = link.release() {
                self.dispatch_peer(ctx, peer, d);
            }
        }
    }

    // Routing

    fn forward(&mut self, ctx: &mut Context<FogEvent>, tuple: Tuple) -> SimResult {
        match tuple.direction {
            Direction::Up => self.send_up(ctx, tuple),
            Direction::Down => {
                for child in self.children.clone() {
                    self.send_down(ctx, child, tuple.clone());
                }
            }
            Direction::Neighbor => {
                for peer in self.peers.clone() {
                    self.send_peer(ctx, peer, tuple.clone());
                }
            }
            Direction::Actuator => return self.send_tuple_to_actuator(ctx, tuple),
        }
        Ok(())
    }

    fn send_tuple_to_actuator(&mut self, ctx: &mut Context<FogEvent>, mut tuple: Tuple) -> SimResult {
        let dest = tuple.dest_module.clone().unwrap_or_default();
        for (actuator, actuator_type, delay_ms) in &self.actuators {
            if *actuator_type == dest {
                tuple.actuator_id = Some(*actuator);
                trace!(self.entity; "delivering {} to actuator {actuator}", tuple.tag);
                ctx.send(*actuator, *delay_ms, FogEvent::TupleArrival(tuple));
                return Ok(());
            }
        }
        // No local association: best-effort broadcast towards the leaves.
        for child in self.children.clone() {
            self.send_down(ctx, child, tuple.clone());
        }
        Ok(())
    }

    fn process_tuple_arrival(
        &mut self,
        ctx: &mut Context<FogEvent>,
        src: Option<EntityId>,
        mut tuple: Tuple,
    ) -> SimResult {
        debug!(self.entity; "received {} ({}) from {src:?}", tuple, tuple.tag);

        if self.is_root() {
            self.update_cloud_traffic(ctx.now_ms());
        }
        if let Some(src) = src {
            ctx.send_now(src, FogEvent::TupleAck);
        }

        if tuple.direction == Direction::Actuator {
            return self.send_tuple_to_actuator(ctx, tuple);
        }

        if self.is_root() && tuple.dest_module.is_none() {
            if let Some(controller) = self.controller {
                ctx.send_now(controller, FogEvent::TupleFinished);
            }
            destroy_tag!(self.entity; tuple.tag);
            return Ok(());
        }

        if !self.applications.contains_key(&tuple.app_id) {
            return self.forward(ctx, tuple);
        }

        let hosted = tuple.dest_module.as_ref().is_some_and(|dest| {
            self.app_to_modules
                .get(&tuple.app_id)
                .is_some_and(|names| names.contains(dest))
        });
        if hosted {
            let dest = tuple.dest_module.clone().unwrap_or_default();
            let Some(idx) = self.module_index(&tuple.app_id, &dest) else {
                debug!(self.entity; "no instance of {dest} yet, dropping {}", tuple.tag);
                destroy_tag!(self.entity; tuple.tag);
                return Ok(());
            };
            let instance = self.modules[idx].instance_id;
            if tuple
                .module_copy_map
                .get(&dest)
                .is_some_and(|pinned| *pinned != instance)
            {
                debug!(self.entity; "{} pinned to another copy of {dest}, dropping", tuple.tag);
                destroy_tag!(self.entity; tuple.tag);
                return Ok(());
            }
            tuple.module_copy_map.insert(dest, instance);
            self.update_timings_on_receipt(ctx.now_ms(), &tuple);
            self.execute_tuple(ctx, tuple, idx);
            Ok(())
        } else if tuple.dest_module.is_some() {
            self.forward(ctx, tuple)
        } else {
            // End of processing below the root travels towards it.
            self.send_up(ctx, tuple);
            Ok(())
        }
    }

    // Execution and accounting

    fn execute_tuple(&mut self, ctx: &mut Context<FogEvent>, tuple: Tuple, idx: usize) {
        if tuple.direction == Direction::Up {
            if let Some(upstream) = tuple.source_instance_id {
                self.modules[idx].observe_upstream(&tuple.src_module, upstream);
            }
        }
        self.registry.execution_started(tuple.tag, ctx.now_ms());

        let name = self.modules[idx].name.clone();
        self.update_allocated_mips(ctx, Some(name.as_str()));
        self.modules[idx].scheduler.submit(tuple, ctx.now_ms());
        self.update_allocated_mips(ctx, Some(name.as_str()));
    }

    /// Recompute capacity shares: a module gets the entire host capacity
    /// while it is running or about to receive `incoming`, and nothing
    /// otherwise. Energy/cost accounting runs on every change.
    fn update_allocated_mips(&mut self, ctx: &mut Context<FogEvent>, incoming: Option<&str>) {
        let now_ms = ctx.now_ms();
        for module in &mut self.modules {
            let mips = if module.scheduler.is_running() || incoming == Some(module.name.as_str()) {
                self.params.mips
            } else {
                0.0
            };
            module.scheduler.set_allocated(now_ms, mips);
        }
        self.update_energy_accounting(now_ms);
        self.schedule_execution_update(ctx);
    }

    /// Zero-order-hold accounting: the previous utilization is assumed to
    /// have held since the last snapshot.
    fn update_energy_accounting(&mut self, now_ms: f64) {
        let elapsed_s = (now_ms - self.last_util_update_ms) / 1000.0;
        self.energy_ws += elapsed_s * self.power_model.power(self.last_utilization);
        self.total_cost +=
            elapsed_s * self.params.rate_per_mips * self.last_utilization * self.params.mips;

        let allocated: f64 = self
            .modules
            .iter()
            .map(|m| m.scheduler.allocated_mips())
            .sum();
        self.last_utilization = (allocated / self.params.mips).min(1.0);
        self.last_util_update_ms = now_ms;
    }

    fn schedule_execution_update(&mut self, ctx: &mut Context<FogEvent>) {
        let now_ms = ctx.now_ms();
        let next = self
            .modules
            .iter()
            .filter_map(|m| m.scheduler.next_finish_ms(now_ms))
            .min_by(f64::total_cmp);
        if let Some(next) = next {
            let due = next.max(now_ms);
            if self.exec_update_pending.is_none_or(|pending| due < pending - 1e-9) {
                self.exec_update_pending = Some(due);
                ctx.send_to_self(due - now_ms, FogEvent::ExecutionUpdate);
            }
        }
    }

    fn execution_update(&mut self, ctx: &mut Context<FogEvent>) {
        self.exec_update_pending = None;
        let now_ms = ctx.now_ms();
        for module in &mut self.modules {
            module.scheduler.progress(now_ms);
        }

        for idx in 0..self.modules.len() {
            let finished = self.modules[idx].scheduler.take_finished();
            if finished.is_empty() {
                continue;
            }
            let name = self.modules[idx].name.clone();
            let instance = self.modules[idx].instance_id;
            for tuple in finished {
                self.registry
                    .execution_finished(tuple.tag, &tuple.tuple_type, now_ms);
                trace!(self.entity; "{} finished on {name}", tuple.tag);

                let results = match self.applications.get_mut(&tuple.app_id) {
                    Some(app) => app.resultant_tuples(&self.entity, &name, &tuple, instance),
                    None => Vec::new(),
                };
                for mut out in results {
                    self.update_timings_on_sending(now_ms, &mut out);
                    ctx.send_now(ctx.self_id(), FogEvent::TupleArrival(out));
                }
                destroy_tag!(self.entity; tuple.tag);
            }
        }

        self.update_allocated_mips(ctx, None);
    }

    // Loop latency bookkeeping

    fn update_timings_on_sending(&self, now_ms: f64, tuple: &mut Tuple) {
        let Some(app) = self.applications.get(&tuple.app_id) else {
            return;
        };
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

    fn update_timings_on_receipt(&self, now_ms: f64, tuple: &Tuple) {
        let Some(app) = self.applications.get(&tuple.app_id) else {
            return;
        };
        let Some(dest) = tuple.dest_module.as_deref() else {
            return;
        };
        for lp in &app.loops {
            if lp.ends_with_edge(&tuple.src_module, dest) {
                let Some(id) = tuple.logical_id else {
                    break;
                };
                // Absent emit record: the loop started before monitoring.
                let Some(start) = self.registry.consume_emit(id) else {
                    break;
                };
                self.registry.fold_sample(lp.loop_id, now_ms - start);
                break;
            }
        }
    }

    // Module lifecycle and periodic emission

    fn launch_module(&mut self, ctx: &mut Context<FogEvent>, app_id: &str, module_name: &str) {
        if self.module_index(app_id, module_name).is_some() {
            warn!(self.entity; "{module_name} already hosted for {app_id}");
            return;
        }
        self.app_to_modules
            .entry(String::from(app_id))
            .or_default()
            .insert(String::from(module_name));
        let module = AppModule::new(&self.entity, app_id, module_name);
        info!(self.entity; "hosting {module_name} ({}) for {app_id}", module.instance_id);
        self.modules.push(module);

        if let Some(app) = self.applications.get(app_id) {
            for edge in app.periodic_edges().filter(|e| e.source == module_name) {
                if let Some(period_ms) = edge.periodicity_ms {
                    ctx.send_to_self(
                        period_ms,
                        FogEvent::SendPeriodicTuple {
                            app_id: String::from(app_id),
                            tuple_type: edge.tuple_type.clone(),
                        },
                    );
                }
            }
        }
    }

    fn release_module(&mut self, app_id: &str, module_name: &str) {
        info!(self.entity; "releasing {module_name} for {app_id}");
        self.modules
            .retain(|m| !(m.app_id == app_id && m.name == module_name));
        if let Some(names) = self.app_to_modules.get_mut(app_id) {
            names.remove(module_name);
        }
    }

    fn send_periodic(&mut self, ctx: &mut Context<FogEvent>, app_id: &str, tuple_type: &str) {
        let Some(app) = self.applications.get(app_id) else {
            return;
        };
        let Some(edge) = app.edge_by_tuple_type(tuple_type).cloned() else {
            return;
        };
        // A migrated-away source module stops the emission; no re-arm.
        let Some(idx) = self.module_index(app_id, &edge.source) else {
            trace!(self.entity; "{} no longer hosted, stopping periodic {tuple_type}", edge.source);
            return;
        };
        let instance = self.modules[idx].instance_id;
        let count = if edge.direction == Direction::Up {
            self.modules[idx].num_instances
        } else {
            1
        };

        let app = &self.applications[app_id];
        let mut tuples = Vec::with_capacity(count);
        for _ in 0..count {
            tuples.push(app.create_tuple(&self.entity, &edge, Some(instance)));
        }
        for mut tuple in tuples {
            self.update_timings_on_sending(ctx.now_ms(), &mut tuple);
            ctx.send_now(ctx.self_id(), FogEvent::TupleArrival(tuple));
        }

        if let Some(period_ms) = edge.periodicity_ms {
            ctx.send_to_self(
                period_ms,
                FogEvent::SendPeriodicTuple {
                    app_id: String::from(app_id),
                    tuple_type: String::from(tuple_type),
                },
            );
        }
    }
}

impl SimEntity<FogEvent> for FogDevice {
    fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    fn start(&mut self, ctx: &mut Context<FogEvent>) -> SimResult {
        ctx.send_to_self(ctx.resource_mgmt_interval_ms(), FogEvent::ResourceMgmt);
        Ok(())
    }

    fn process(
        &mut self,
        ctx: &mut Context<FogEvent>,
        src: Option<EntityId>,
        event: FogEvent,
    ) -> SimResult {
        match event {
            FogEvent::TupleArrival(tuple) => self.process_tuple_arrival(ctx, src, tuple),
            FogEvent::TupleAck => Ok(()),
            FogEvent::TupleFinished => Ok(()),
            FogEvent::AppSubmit(app) => {
                info!(self.entity; "application {} submitted", app.app_id);
                self.applications.insert(app.app_id.clone(), app);
                Ok(())
            }
            FogEvent::ActiveAppUpdate { app_id } => {
                self.active_apps.insert(app_id);
                Ok(())
            }
            FogEvent::LaunchModule {
                app_id,
                module_name,
            } => {
                self.launch_module(ctx, &app_id, &module_name);
                Ok(())
            }
            FogEvent::LaunchModuleInstance {
                app_id,
                module_name,
                instance_count,
            } => {
                self.instance_targets
                    .insert((app_id, module_name), instance_count);
                Ok(())
            }
            FogEvent::ReleaseModule {
                app_id,
                module_name,
            } => {
                self.release_module(&app_id, &module_name);
                Ok(())
            }
            FogEvent::SensorJoined { sensor } => {
                self.sensors.push(sensor);
                ctx.send_now(sensor, FogEvent::TupleAck);
                Ok(())
            }
            FogEvent::ActuatorJoined {
                actuator,
                actuator_type,
                latency_ms,
            } => {
                self.actuators.push((actuator, actuator_type, latency_ms));
                Ok(())
            }
            FogEvent::SendPeriodicTuple { app_id, tuple_type } => {
                self.send_periodic(ctx, &app_id, &tuple_type);
                Ok(())
            }
            FogEvent::NorthLinkFree => {
                self.north_link_free(ctx);
                Ok(())
            }
            FogEvent::SouthLinkFree { child } => {
                self.south_link_free(ctx, child);
                Ok(())
            }
            FogEvent::PeerLinkFree { peer } => {
                self.peer_link_free(ctx, peer);
                Ok(())
            }
            FogEvent::ResourceMgmt => {
                self.update_energy_accounting(ctx.now_ms());
                ctx.send_to_self(ctx.resource_mgmt_interval_ms(), FogEvent::ResourceMgmt);
                Ok(())
            }
            FogEvent::ExecutionUpdate => {
                self.execution_update(ctx);
                Ok(())
            }
            FogEvent::EmitTuple => {
                warn!(self.entity; "unexpected emit event");
                Ok(())
            }
        }
    }
}
