// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Models of a fog computing topology.
//!
//! A topology is a tree of [devices](device::FogDevice) with
//! [sensors](sensor::Sensor) and [actuators](actuator::Actuator) at the
//! leaves and a [controller](controller::Controller) orchestrating
//! application launch. Applications are dataflow graphs of modules; each
//! device routes [tuples](tuple::Tuple) between its hosted module
//! instances and its links, and accounts for the energy and cost of the
//! work it executes.

// Enable warnings for missing documentation
#![warn(missing_docs)]

pub mod actuator;
pub mod application;
pub mod controller;
pub mod device;
pub mod events;
pub mod module;
pub mod monitor;
pub mod sensor;
pub mod timekeeper;
pub mod tuple;
