//! Worker production up to saturation

use crate::core::types::{UnitKind, Urgency};
use crate::producers::{base_count, Producer};
use crate::requests::Request;
use crate::world::{Intel, UnitSnapshot, World};

#[derive(Debug, Clone)]
pub struct WorkerBuilder {
    pub worker_kind: UnitKind,
    /// Workers one base can keep busy
    pub per_base: u32,
    /// Hard ceiling regardless of base count
    pub max_workers: u32,
}

impl WorkerBuilder {
    pub fn new(worker_kind: UnitKind) -> Self {
        Self {
            worker_kind,
            per_base: 16,
            max_workers: 70,
        }
    }

    pub fn wanted(&self, bases: u32) -> u32 {
        (self.per_base * bases).min(self.max_workers)
    }
}

impl Producer for WorkerBuilder {
    fn name(&self) -> &'static str {
        "workers"
    }

    fn produce(&mut self, world: &dyn World, own: &[UnitSnapshot], _intel: &Intel) -> Vec<Request> {
        let have = own.iter().filter(|u| u.kind == self.worker_kind).count() as u32
            + world.pending(self.worker_kind);
        if have >= self.wanted(base_count(own)) {
            return Vec::new();
        }
        vec![Request::train(self.worker_kind, Urgency::VeryHigh)]
    }
}
