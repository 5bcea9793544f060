// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The event protocol spoken between fog entities.

use fogsim_engine::types::EntityId;

use crate::application::Application;
use crate::tuple::Tuple;

/// Events delivered between devices, sensors, actuators and the
/// controller.
#[derive(Clone, Debug)]
pub enum FogEvent {
    /// A tuple arrives at an entity.
    TupleArrival(Tuple),

    /// Acknowledgment of a tuple arrival; no state change beyond receipt.
    TupleAck,

    /// A sink tuple completed at the topology root.
    TupleFinished,

    /// Register an application definition.
    AppSubmit(Application),

    /// Mark an application active.
    ActiveAppUpdate {
        /// The application being activated.
        app_id: String,
    },

    /// Host the named module here.
    LaunchModule {
        /// Owning application.
        app_id: String,
        /// Module to place.
        module_name: String,
    },

    /// Record the desired replica count for a module.
    LaunchModuleInstance {
        /// Owning application.
        app_id: String,
        /// Module the count applies to.
        module_name: String,
        /// Desired number of replicas.
        instance_count: usize,
    },

    /// Remove the named module from this host.
    ReleaseModule {
        /// Owning application.
        app_id: String,
        /// Module to remove.
        module_name: String,
    },

    /// A sensor announces itself to its gateway.
    SensorJoined {
        /// The joining sensor.
        sensor: EntityId,
    },

    /// An actuator announces itself to its gateway.
    ActuatorJoined {
        /// The joining actuator.
        actuator: EntityId,
        /// Type used to match tuple destinations.
        actuator_type: String,
        /// Delivery delay from the gateway to the actuator.
        latency_ms: f64,
    },

    /// Emit the periodic tuples for one application edge and re-arm.
    SendPeriodicTuple {
        /// Owning application.
        app_id: String,
        /// Tuple type identifying the edge.
        tuple_type: String,
    },

    /// The uplink's in-flight transfer completed; drain its queue.
    NorthLinkFree,

    /// A downlink's in-flight transfer completed; drain its queue.
    SouthLinkFree {
        /// The child whose link freed.
        child: EntityId,
    },

    /// A peer link's in-flight transfer completed; drain its queue.
    PeerLinkFree {
        /// The peer whose link freed.
        peer: EntityId,
    },

    /// Periodic housekeeping: refresh energy/cost accounting and re-arm.
    ResourceMgmt,

    /// Predicted completion time of running work was reached.
    ExecutionUpdate,

    /// A sensor's next emission is due.
    EmitTuple,
}
