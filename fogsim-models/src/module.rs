// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! A placed module instance and its work scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use fogsim_track::entity::Entity;

use crate::tuple::{ModuleInstanceId, Tuple};

/// Work items closer than this to completion count as finished.
const FINISH_EPSILON_MI: f64 = 1e-9;

struct Work {
    tuple: Tuple,
    remaining_mi: f64,
}

/// Time-shared progress of submitted tuples under an allocated MIPS
/// budget.
///
/// All running items share the allocation equally. Progress is computed
/// lazily: the owner calls [`progress`](WorkScheduler::progress) before
/// changing the allocation or harvesting finished work.
#[derive(Default)]
pub struct WorkScheduler {
    running: Vec<Work>,
    allocated_mips: f64,
    last_update_ms: f64,
}

impl WorkScheduler {
    /// Advance every running item to `now_ms` at the current allocation.
    pub fn progress(&mut self, now_ms: f64) {
        let elapsed_ms = now_ms - self.last_update_ms;
        self.last_update_ms = now_ms;
        if elapsed_ms <= 0.0 || self.running.is_empty() || self.allocated_mips <= 0.0 {
            return;
        }
        let share = self.allocated_mips / self.running.len() as f64;
        let executed_mi = share * elapsed_ms / 1000.0;
        for work in &mut self.running {
            work.remaining_mi -= executed_mi;
        }
    }

    /// Submit a tuple for execution. The caller must have progressed the
    /// scheduler to `now_ms` first.
    pub fn submit(&mut self, tuple: Tuple, now_ms: f64) {
        self.progress(now_ms);
        let remaining_mi = tuple.cpu_length_mi;
        self.running.push(Work {
            tuple,
            remaining_mi,
        });
    }

    /// Change the MIPS allocation, progressing outstanding work first.
    pub fn set_allocated(&mut self, now_ms: f64, mips: f64) {
        self.progress(now_ms);
        self.allocated_mips = mips;
    }

    /// The time the earliest running item will finish, if any work is
    /// running and the allocation is non-zero.
    #[must_use]
    pub fn next_finish_ms(&self, now_ms: f64) -> Option<f64> {
        if self.running.is_empty() || self.allocated_mips <= 0.0 {
            return None;
        }
        let share = self.allocated_mips / self.running.len() as f64;
        self.running
            .iter()
            .map(|w| now_ms + (w.remaining_mi.max(0.0) / share) * 1000.0)
            .min_by(f64::total_cmp)
    }

    /// Remove and return the tuples whose work has completed.
    pub fn take_finished(&mut self) -> Vec<Tuple> {
        let mut finished = Vec::new();
        let mut i = 0;
        while i < self.running.len() {
            if self.running[i].remaining_mi <= FINISH_EPSILON_MI {
                finished.push(self.running.remove(i).tuple);
            } else {
                i += 1;
            }
        }
        finished
    }

    /// Whether any work is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }

    /// The current MIPS allocation.
    #[must_use]
    pub fn allocated_mips(&self) -> f64 {
        self.allocated_mips
    }
}

/// A module instance hosted on a device.
pub struct AppModule {
    /// Track entity below the hosting device.
    pub entity: Arc<Entity>,

    /// Module name within the application.
    pub name: String,

    /// Owning application.
    pub app_id: String,

    /// Simulation-wide instance identity used for route pinning.
    pub instance_id: ModuleInstanceId,

    /// Maximum upstream fan-in observed so far; drives periodic fan-out
    /// for UP edges.
    pub num_instances: usize,

    /// Distinct upstream instance ids seen per source module.
    pub down_instance_ids: HashMap<String, Vec<ModuleInstanceId>>,

    /// Execution state.
    pub scheduler: WorkScheduler,
}

impl AppModule {
    /// Create an instance of `name` below the hosting device's entity.
    #[must_use]
    pub fn new(host: &Arc<Entity>, app_id: &str, name: &str) -> Self {
        let entity = Arc::new(Entity::new(host, name));
        let instance_id = ModuleInstanceId(entity.tag.0);
        Self {
            entity,
            name: String::from(name),
            app_id: String::from(app_id),
            instance_id,
            num_instances: 0,
            down_instance_ids: HashMap::new(),
            scheduler: WorkScheduler::default(),
        }
    }

    /// Record an upstream sender and refresh the observed fan-in.
    pub fn observe_upstream(&mut self, src_module: &str, instance: ModuleInstanceId) {
        let ids = self
            .down_instance_ids
            .entry(String::from(src_module))
            .or_default();
        if !ids.contains(&instance) {
            ids.push(instance);
        }
        self.num_instances = self
            .down_instance_ids
            .values()
            .map(Vec::len)
            .max()
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use fogsim_track::entity::toplevel;
    use fogsim_track::tracker::dev_null_tracker;

    use super::*;
    use crate::tuple::Direction;

    fn tuple(host: &Arc<Entity>, cpu_length_mi: f64) -> Tuple {
        Tuple::new(
            host,
            "app",
            "VIDEO",
            "sensor",
            Some("detector"),
            Direction::Up,
            100,
            cpu_length_mi,
        )
    }

    #[test]
    fn single_item_finishes_at_length_over_mips() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        let mut sched = WorkScheduler::default();
        sched.set_allocated(0.0, 1000.0);
        sched.submit(tuple(&top, 1000.0), 0.0);

        // 1000 MI at 1000 MIPS is one second.
        assert_eq!(sched.next_finish_ms(0.0), Some(1000.0));
        sched.progress(1000.0);
        assert_eq!(sched.take_finished().len(), 1);
        assert!(!sched.is_running());
    }

    #[test]
    fn running_items_share_the_allocation() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        let mut sched = WorkScheduler::default();
        sched.set_allocated(0.0, 1000.0);
        sched.submit(tuple(&top, 500.0), 0.0);
        sched.submit(tuple(&top, 500.0), 0.0);

        // Two items at 500 MIPS each finish together.
        assert_eq!(sched.next_finish_ms(0.0), Some(1000.0));
        sched.progress(1000.0);
        assert_eq!(sched.take_finished().len(), 2);
    }

    #[test]
    fn zero_allocation_makes_no_progress() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        let mut sched = WorkScheduler::default();
        sched.submit(tuple(&top, 100.0), 0.0);
        assert_eq!(sched.next_finish_ms(0.0), None);
        sched.progress(5000.0);
        assert!(sched.take_finished().is_empty());
        assert!(sched.is_running());
    }

    #[test]
    fn observed_fan_in_is_max_across_sources() {
        let tracker = dev_null_tracker();
        let top = toplevel(&tracker, "top");
        let mut module = AppModule::new(&top, "app", "detector");
        assert_eq!(module.num_instances, 0);

        module.observe_upstream("camera", ModuleInstanceId(1));
        module.observe_upstream("camera", ModuleInstanceId(2));
        module.observe_upstream("camera", ModuleInstanceId(2));
        module.observe_upstream("lidar", ModuleInstanceId(3));
        assert_eq!(module.num_instances, 2);
    }
}
