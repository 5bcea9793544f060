// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Engine configuration.
//!
//! Values come from three layers, later layers overriding earlier ones:
//! built-in defaults, an optional `fogsim.toml` file in the working
//! directory, and `FOGSIM_`-prefixed environment variables.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::types::SimError;

/// Tunable engine parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimConfig {
    /// Smallest delay used when an entity wants to send "immediately".
    /// Acknowledgments and other zero-work responses use this gap.
    pub min_event_gap_ms: f64,

    /// Interval between periodic resource management events at each node.
    pub resource_mgmt_interval_ms: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            min_event_gap_ms: 0.01,
            resource_mgmt_interval_ms: 100.0,
        }
    }
}

impl SimConfig {
    /// Load the configuration from defaults, `fogsim.toml` and the
    /// environment.
    pub fn load() -> Result<Self, SimError> {
        Figment::from(Serialized::defaults(SimConfig::default()))
            .merge(Toml::file("fogsim.toml"))
            .merge(Env::prefixed("FOGSIM_"))
            .extract()
            .map_err(|e| SimError(e.to_string()))
    }
}
