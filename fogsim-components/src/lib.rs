// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Reusable building blocks for FOGSIM models.
//!
//! The components here are pure state machines and value types: they do not
//! talk to the engine directly. A model owns them, feeds them from its event
//! handlers, and schedules whatever follow-up events they report.

// Enable warnings for missing documentation
#![warn(missing_docs)]

pub mod distribution;
pub mod link;
pub mod power;
pub mod traits;
