// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The [`SimEntity`] trait implemented by everything that receives events.

use std::any::Any;
use std::sync::Arc;

use fogsim_track::entity::Entity;

use crate::engine::Context;
use crate::types::{EntityId, SimResult};

/// An addressable participant in the simulation.
///
/// Each entity owns a track [`Entity`] for its place in the hierarchy and
/// handles the events delivered to its [`EntityId`](crate::types::EntityId).
/// Handlers run to completion; delays are modelled by scheduling follow-up
/// events through the [`Context`], never by blocking.
///
/// The `Any` supertrait allows tests and scenario drivers to downcast a
/// registered entity back to its concrete type via
/// [`Engine::entity_ref`](crate::engine::Engine::entity_ref).
pub trait SimEntity<E>: Any {
    /// The track entity used for logging and naming.
    fn entity(&self) -> &Arc<Entity>;

    /// Called once before the first event is dispatched.
    fn start(&mut self, ctx: &mut Context<E>) -> SimResult {
        let _ = ctx;
        Ok(())
    }

    /// Handle an event delivered to this entity.
    ///
    /// `src` is the sending entity, or `None` when the event was injected
    /// from outside the simulation.
    fn process(&mut self, ctx: &mut Context<E>, src: Option<EntityId>, event: E) -> SimResult;
}
