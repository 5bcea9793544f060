// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Application descriptors: modules, edges, monitored loops and
//! selectivity.

use std::collections::HashMap;
use std::sync::Arc;

use fogsim_track::entity::Entity;

use crate::timekeeper::LoopId;
use crate::tuple::{Direction, ModuleInstanceId, Tuple};

/// What kind of endpoint an edge connects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AppEdgeType {
    /// From a sensor into the application.
    Sensor,
    /// Between two modules.
    Module,
    /// From a module out to an actuator type.
    Actuator,
}

/// A directed edge of the application graph.
#[derive(Clone, Debug)]
pub struct AppEdge {
    /// Emitting module or sensor type.
    pub source: String,

    /// Destination module or actuator type.
    pub dest: String,

    /// For periodic edges, the emission period.
    pub periodicity_ms: Option<f64>,

    /// Computational length of tuples on this edge.
    pub cpu_length_mi: f64,

    /// Payload size of tuples on this edge.
    pub size_bytes: usize,

    /// Tuple type carried; unique within an application.
    pub tuple_type: String,

    /// Direction tuples on this edge travel.
    pub direction: Direction,

    /// Endpoint kind.
    pub edge_type: AppEdgeType,
}

/// An ordered path of module names whose end-to-end latency is tracked.
#[derive(Clone, Debug)]
pub struct AppLoop {
    /// The registry id delay samples are folded under.
    pub loop_id: LoopId,

    /// Module names along the path, in order.
    pub modules: Vec<String>,
}

impl AppLoop {
    /// Create a monitored loop over the given module path.
    #[must_use]
    pub fn new(loop_id: LoopId, modules: Vec<String>) -> Self {
        assert!(modules.len() >= 2, "a loop needs at least two modules");
        Self { loop_id, modules }
    }

    fn has_edge(&self, src: &str, dest: &str) -> bool {
        self.modules
            .windows(2)
            .any(|pair| pair[0] == src && pair[1] == dest)
    }

    /// Whether `(src, dest)` is this loop's starting edge.
    #[must_use]
    pub fn starts_with_edge(&self, src: &str, dest: &str) -> bool {
        self.has_edge(src, dest) && self.modules.first().is_some_and(|m| m == src)
    }

    /// Whether `(src, dest)` is this loop's ending edge.
    #[must_use]
    pub fn ends_with_edge(&self, src: &str, dest: &str) -> bool {
        self.has_edge(src, dest) && self.modules.last().is_some_and(|m| m == dest)
    }
}

/// Fractional fan-out: emits one tuple each time the accumulated fraction
/// reaches one.
///
/// The accumulator makes the selection deterministic while preserving the
/// long-run rate.
#[derive(Clone, Debug)]
pub struct FractionalSelectivity {
    fraction: f64,
    accumulated: f64,
}

impl FractionalSelectivity {
    /// Create a selectivity emitting `fraction` outputs per input.
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        assert!((0.0..=1.0).contains(&fraction), "fraction out of range");
        Self {
            fraction,
            accumulated: 0.0,
        }
    }

    fn can_select(&mut self) -> bool {
        self.accumulated += self.fraction;
        // Tolerance so an exact rate like 20 x 0.05 still fires.
        if self.accumulated >= 1.0 - 1e-9 {
            self.accumulated -= 1.0;
            return true;
        }
        false
    }
}

/// A streaming application: modules, edges, loops and per-module
/// selectivity.
#[derive(Clone, Debug, Default)]
pub struct Application {
    /// Application identity.
    pub app_id: String,

    /// Names of the application's modules.
    pub modules: Vec<String>,

    /// The application graph's edges.
    pub edges: Vec<AppEdge>,

    /// Monitored loops.
    pub loops: Vec<AppLoop>,

    /// (module, input type, output type) to selection state.
    selectivity: HashMap<(String, String, String), FractionalSelectivity>,
}

impl Application {
    /// Create an empty application.
    #[must_use]
    pub fn new(app_id: &str) -> Self {
        Self {
            app_id: String::from(app_id),
            ..Self::default()
        }
    }

    /// Add a module name.
    pub fn add_module(&mut self, name: &str) {
        self.modules.push(String::from(name));
    }

    /// Add an edge.
    ///
    /// # Panics
    ///
    /// Panics if an edge with the same tuple type already exists.
    pub fn add_edge(&mut self, edge: AppEdge) {
        assert!(
            self.edge_by_tuple_type(&edge.tuple_type).is_none(),
            "duplicate tuple type {}",
            edge.tuple_type
        );
        self.edges.push(edge);
    }

    /// Add a monitored loop.
    pub fn add_loop(&mut self, app_loop: AppLoop) {
        self.loops.push(app_loop);
    }

    /// Declare that `module` emits `output_type` tuples for `input_type`
    /// tuples at the given rate.
    pub fn add_selectivity(&mut self, module: &str, input_type: &str, output_type: &str, fraction: f64) {
        self.selectivity.insert(
            (
                String::from(module),
                String::from(input_type),
                String::from(output_type),
            ),
            FractionalSelectivity::new(fraction),
        );
    }

    /// Look up the edge carrying the given tuple type.
    #[must_use]
    pub fn edge_by_tuple_type(&self, tuple_type: &str) -> Option<&AppEdge> {
        self.edges.iter().find(|e| e.tuple_type == tuple_type)
    }

    /// Edges that emit on a fixed period.
    pub fn periodic_edges(&self) -> impl Iterator<Item = &AppEdge> {
        self.edges.iter().filter(|e| e.periodicity_ms.is_some())
    }

    /// Create a tuple for the given edge.
    ///
    /// Tuples on actuator edges travel with [`Direction::Actuator`]
    /// regardless of the edge's own direction, so that routing matches on
    /// the attached actuator type.
    #[must_use]
    pub fn create_tuple(
        &self,
        created_by: &Arc<Entity>,
        edge: &AppEdge,
        source_instance: Option<ModuleInstanceId>,
    ) -> Tuple {
        let direction = match edge.edge_type {
            AppEdgeType::Actuator => Direction::Actuator,
            _ => edge.direction,
        };
        let mut tuple = Tuple::new(
            created_by,
            &self.app_id,
            &edge.tuple_type,
            &edge.source,
            Some(&edge.dest),
            direction,
            edge.size_bytes,
            edge.cpu_length_mi,
        );
        tuple.source_instance_id = source_instance;
        tuple
    }

    /// Derive the tuples a module emits after completing `completed`.
    ///
    /// Fan-out follows the configured selectivity; each resultant tuple
    /// carries the copy map forward with `instance` bound for `module`, and
    /// inherits the logical id for loop correlation.
    pub fn resultant_tuples(
        &mut self,
        created_by: &Arc<Entity>,
        module: &str,
        completed: &Tuple,
        instance: ModuleInstanceId,
    ) -> Vec<Tuple> {
        let mut selected = Vec::new();
        for edge in self.edges.iter().filter(|e| e.source == module) {
            let key = (
                String::from(module),
                completed.tuple_type.clone(),
                edge.tuple_type.clone(),
            );
            if let Some(sel) = self.selectivity.get_mut(&key) {
                if sel.can_select() {
                    selected.push(edge.clone());
                }
            }
        }

        let mut tuples = Vec::with_capacity(selected.len());
        for edge in selected {
            let mut tuple = self.create_tuple(created_by, &edge, Some(instance));
            tuple.module_copy_map = completed.module_copy_map.clone();
            tuple.module_copy_map.insert(String::from(module), instance);
            tuple.logical_id = completed.logical_id;
            tuples.push(tuple);
        }
        tuples
    }
}

#[cfg(test)]
mod tests {
    use fogsim_track::entity::toplevel;
    use fogsim_track::tracker::dev_null_tracker;

    use super::*;
    use crate::tuple::LogicalTupleId;

    fn edge(source: &str, dest: &str, tuple_type: &str, edge_type: AppEdgeType) -> AppEdge {
        AppEdge {
            source: String::from(source),
            dest: String::from(dest),
            periodicity_ms: None,
            cpu_length_mi: 100.0,
            size_bytes: 500,
            tuple_type: String::from(tuple_type),
            direction: Direction::Up,
            edge_type,
        }
    }

    #[test]
    fn loop_edge_predicates() {
        let lp = AppLoop::new(
            LoopId(0),
            vec![
                String::from("detector"),
                String::from("tracker"),
                String::from("ui"),
            ],
        );
        assert!(lp.starts_with_edge("detector", "tracker"));
        assert!(!lp.starts_with_edge("tracker", "ui"));
        assert!(lp.ends_with_edge("tracker", "ui"));
        assert!(!lp.ends_with_edge("detector", "tracker"));
        assert!(!lp.starts_with_edge("detector", "ui"));
    }

    #[test]
    fn unit_selectivity_always_selects() {
        let mut sel = FractionalSelectivity::new(1.0);
        for _ in 0..5 {
            assert!(sel.can_select());
        }
    }

    #[test]
    fn fractional_selectivity_matches_rate() {
        let mut sel = FractionalSelectivity::new(0.05);
        let selected = (0..100).filter(|_| sel.can_select()).count();
        assert_eq!(selected, 5);
    }

    #[test]
    fn resultant_tuples_carry_copy_map_and_logical_id() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");

        let mut app = Application::new("dcns");
        app.add_module("detector");
        app.add_edge(edge("detector", "tracker", "LOCATION", AppEdgeType::Module));
        app.add_selectivity("detector", "VIDEO", "LOCATION", 1.0);

        let in_edge = edge("sensor", "detector", "VIDEO", AppEdgeType::Module);
        let mut completed = app.create_tuple(&top, &in_edge, None);
        completed.logical_id = Some(LogicalTupleId(9));
        completed
            .module_copy_map
            .insert(String::from("sensor"), ModuleInstanceId(1));

        let out = app.resultant_tuples(&top, "detector", &completed, ModuleInstanceId(7));
        assert_eq!(out.len(), 1);
        let t = &out[0];
        assert_eq!(t.tuple_type, "LOCATION");
        assert_eq!(t.logical_id, Some(LogicalTupleId(9)));
        assert_eq!(t.module_copy_map.get("sensor"), Some(&ModuleInstanceId(1)));
        assert_eq!(t.module_copy_map.get("detector"), Some(&ModuleInstanceId(7)));
        assert_eq!(t.source_instance_id, Some(ModuleInstanceId(7)));
    }

    #[test]
    fn no_selectivity_means_no_output() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");

        let mut app = Application::new("dcns");
        app.add_edge(edge("detector", "tracker", "LOCATION", AppEdgeType::Module));

        let in_edge = edge("sensor", "detector", "VIDEO", AppEdgeType::Module);
        let completed = app.create_tuple(&top, &in_edge, None);
        let out = app.resultant_tuples(&top, "detector", &completed, ModuleInstanceId(7));
        assert!(out.is_empty());
    }

    #[test]
    fn actuator_edges_route_as_actuator_tuples() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");

        let app = Application::new("dcns");
        let mut ptz = edge("tracker", "PTZ_CONTROL", "PTZ_PARAMS", AppEdgeType::Actuator);
        ptz.direction = Direction::Down;
        let tuple = app.create_tuple(&top, &ptz, None);
        assert_eq!(tuple.direction, Direction::Actuator);
        assert_eq!(tuple.dest_module.as_deref(), Some("PTZ_CONTROL"));
    }

    #[test]
    fn submission_events_are_debug_printable() {
        let mut app = Application::new("dcns");
        app.add_module("detector");
        let event = crate::events::FogEvent::AppSubmit(app);
        let printed = format!("{event:?}");
        assert!(printed.contains("dcns"));
        assert!(printed.contains("detector"));
    }
}
