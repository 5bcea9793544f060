// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Helpers shared by engine and model tests.

use fogsim_track::test_helpers::create_tracker;

use crate::engine::Engine;

/// Create an [`Engine`] whose track output goes to a per-test log file.
///
/// Call with `file!()` so the log file is named after the test source file.
#[must_use]
pub fn start_test<E: 'static>(full_filepath: &str) -> Engine<E> {
    Engine::new(&create_tracker(full_filepath))
}
