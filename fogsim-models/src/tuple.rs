// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The unit of work exchanged between modules, sensors and actuators.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fogsim_components::traits::TotalBytes;
use fogsim_engine::types::EntityId;
use fogsim_track::entity::Entity;
use fogsim_track::tag::{Tag, Tagged};
use fogsim_track::{create, create_tag};

/// Identity of a placed module instance, unique across the simulation.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ModuleInstanceId(pub u64);

impl fmt::Display for ModuleInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Identity used only for loop-latency correlation.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct LogicalTupleId(pub u64);

impl fmt::Display for LogicalTupleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Which way a tuple travels through the topology.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Towards the parent.
    Up,
    /// Towards every child.
    Down,
    /// Towards every peer.
    Neighbor,
    /// Towards a specific attached actuator.
    Actuator,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Neighbor => write!(f, "neighbor"),
            Direction::Actuator => write!(f, "actuator"),
        }
    }
}

/// A unit of data/work flowing between application modules.
#[derive(Clone, Debug)]
pub struct Tuple {
    /// Track tag identifying this tuple in trace output and execution
    /// statistics.
    pub tag: Tag,

    /// The kind of payload, matching an application edge's tuple type.
    pub tuple_type: String,

    /// The module (or sensor) that emitted this tuple.
    pub src_module: String,

    /// The module this tuple is addressed to. `None` marks a final sink.
    pub dest_module: Option<String>,

    /// Routing direction.
    pub direction: Direction,

    /// Payload size driving transfer delay.
    pub size_bytes: usize,

    /// Computational length in million instructions, driving execution
    /// delay.
    pub cpu_length_mi: f64,

    /// Owning application.
    pub app_id: String,

    /// Target actuator, set once an actuator association has matched.
    pub actuator_id: Option<EntityId>,

    /// Which physical instance produced/consumed each module along the
    /// path. Once a destination is recorded here the route is pinned.
    pub module_copy_map: HashMap<String, ModuleInstanceId>,

    /// Loop-latency correlation id, set when this tuple starts a
    /// monitored loop.
    pub logical_id: Option<LogicalTupleId>,

    /// The instance that emitted this tuple, used to count upstream
    /// fan-in.
    pub source_instance_id: Option<ModuleInstanceId>,
}

impl Tuple {
    /// Create a tuple, minting a track tag from `created_by`'s tracker.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        created_by: &Arc<Entity>,
        app_id: &str,
        tuple_type: &str,
        src_module: &str,
        dest_module: Option<&str>,
        direction: Direction,
        size_bytes: usize,
        cpu_length_mi: f64,
    ) -> Self {
        let tuple = Self {
            tag: create_tag!(created_by),
            tuple_type: String::from(tuple_type),
            src_module: String::from(src_module),
            dest_module: dest_module.map(String::from),
            direction,
            size_bytes,
            cpu_length_mi,
            app_id: String::from(app_id),
            actuator_id: None,
            module_copy_map: HashMap::new(),
            logical_id: None,
            source_instance_id: None,
        };
        create!(created_by; tuple, tuple.size_bytes);
        tuple
    }
}

impl Tagged for Tuple {
    fn tag(&self) -> Tag {
        self.tag
    }
}

impl TotalBytes for Tuple {
    fn total_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}[{}] {} -> {} ({})",
            self.tuple_type,
            self.app_id,
            self.src_module,
            self.dest_module.as_deref().unwrap_or("<sink>"),
            self.direction,
        )
    }
}
