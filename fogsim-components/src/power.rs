// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Host power models.

/// Maps a utilization in `[0, 1]` to a power draw in watts.
pub trait PowerModel {
    /// Power draw at the given utilization.
    fn power(&self, utilization: f64) -> f64;
}

/// Linear interpolation between an idle and a busy power figure.
#[derive(Debug)]
pub struct LinearPowerModel {
    busy_power: f64,
    idle_power: f64,
}

impl LinearPowerModel {
    /// Create a model spanning `idle_power` at 0% to `busy_power` at 100%.
    #[must_use]
    pub fn new(busy_power: f64, idle_power: f64) -> Self {
        assert!(busy_power >= idle_power, "busy power below idle power");
        Self {
            busy_power,
            idle_power,
        }
    }
}

impl PowerModel for LinearPowerModel {
    fn power(&self, utilization: f64) -> f64 {
        self.idle_power + (self.busy_power - self.idle_power) * utilization.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_endpoints() {
        let model = LinearPowerModel::new(107.339, 83.4333);
        assert_eq!(model.power(0.0), 83.4333);
        assert_eq!(model.power(1.0), 107.339);
        let mid = model.power(0.5);
        assert!(mid > 83.4333 && mid < 107.339);
    }

    #[test]
    fn clamps_out_of_range_utilization() {
        let model = LinearPowerModel::new(100.0, 80.0);
        assert_eq!(model.power(-0.5), 80.0);
        assert_eq!(model.power(2.0), 100.0);
    }

    #[test]
    fn power_is_monotone() {
        let model = LinearPowerModel::new(100.0, 80.0);
        let mut last = model.power(0.0);
        for i in 1..=10 {
            let p = model.power(f64::from(i) / 10.0);
            assert!(p >= last);
            last = p;
        }
    }
}
