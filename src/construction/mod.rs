//! Construction coordination
//!
//! Two queues of multi-step jobs (building placement and road connection)
//! plus the record of sites ordered in the current command batch.

pub mod connect;
pub mod job;
pub mod placement;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::BuildingType;
use crate::map::point::MapPoint;

pub use job::{Job, JobKind, JobState, SearchMode};
pub use placement::PlacementRule;

/// Connect jobs run before build jobs, at most this many of each per round
pub const MAX_JOBS_PER_KIND: usize = 5;

/// A site ordered since the last network frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionOrder {
    pub pos: MapPoint,
    pub kind: BuildingType,
}

/// Job queues of one player
#[derive(Debug, Default)]
pub struct Construction {
    build_jobs: VecDeque<Job>,
    connect_jobs: VecDeque<Job>,
    orders: Vec<ConstructionOrder>,
}

impl Construction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a build job unless an equal one is already waiting
    pub fn add_build_job(&mut self, job: Job, front: bool) -> bool {
        if self.build_jobs.iter().any(|queued| queued.same_task(&job)) {
            return false;
        }
        if front {
            self.build_jobs.push_front(job);
        } else {
            self.build_jobs.push_back(job);
        }
        true
    }

    /// Queue a connect job unless the flag already has one
    pub fn add_connect_job(&mut self, job: Job) -> bool {
        if self.connect_jobs.iter().any(|queued| queued.same_task(&job)) {
            return false;
        }
        self.connect_jobs.push_back(job);
        true
    }

    pub fn pop_build_job(&mut self) -> Option<Job> {
        self.build_jobs.pop_front()
    }

    pub fn pop_connect_job(&mut self) -> Option<Job> {
        self.connect_jobs.pop_front()
    }

    /// Put an unfinished job at the back of its queue
    pub fn requeue(&mut self, job: Job) {
        match job.kind {
            JobKind::Connect { .. } => self.connect_jobs.push_back(job),
            JobKind::Build { .. } => self.build_jobs.push_back(job),
        }
    }

    pub fn build_job_count(&self) -> usize {
        self.build_jobs.len()
    }

    pub fn connect_job_count(&self) -> usize {
        self.connect_jobs.len()
    }

    pub fn has_jobs(&self) -> bool {
        !self.build_jobs.is_empty() || !self.connect_jobs.is_empty()
    }

    pub fn build_jobs(&self) -> impl Iterator<Item = &Job> + '_ {
        self.build_jobs.iter()
    }

    pub fn connect_jobs(&self) -> impl Iterator<Item = &Job> + '_ {
        self.connect_jobs.iter()
    }

    /// Remember a site ordered in this batch
    pub fn record_order(&mut self, pos: MapPoint, kind: BuildingType) {
        self.orders.push(ConstructionOrder { pos, kind });
    }

    pub fn orders(&self) -> &[ConstructionOrder] {
        &self.orders
    }

    /// The last batch of commands reached the world
    pub fn constructions_executed(&mut self) {
        self.orders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(kind: BuildingType, x: u16) -> Job {
        Job::build(kind, MapPoint::new(x, 0), SearchMode::Radius)
    }

    #[test]
    fn test_build_jobs_deduplicated() {
        let mut c = Construction::new();
        assert!(c.add_build_job(build(BuildingType::Woodcutter, 1), false));
        assert!(!c.add_build_job(build(BuildingType::Woodcutter, 1), false));
        assert!(c.add_build_job(build(BuildingType::Woodcutter, 2), false));
        assert!(c.add_build_job(build(BuildingType::Quarry, 1), false));
        assert_eq!(c.build_job_count(), 3);
    }

    #[test]
    fn test_front_insertion() {
        let mut c = Construction::new();
        c.add_build_job(build(BuildingType::Woodcutter, 1), false);
        c.add_build_job(build(BuildingType::Fortress, 1), true);
        assert_eq!(c.pop_build_job().map(|j| j.building()), Some(Some(BuildingType::Fortress)));
    }

    #[test]
    fn test_connect_jobs_deduplicated_by_flag() {
        let mut c = Construction::new();
        assert!(c.add_connect_job(Job::connect(MapPoint::new(3, 3))));
        assert!(!c.add_connect_job(Job::connect(MapPoint::new(3, 3))));
        assert_eq!(c.connect_job_count(), 1);
        assert!(c.has_jobs());
    }

    #[test]
    fn test_requeue_goes_to_back() {
        let mut c = Construction::new();
        c.add_build_job(build(BuildingType::Woodcutter, 1), false);
        c.add_build_job(build(BuildingType::Quarry, 1), false);
        let first = c.pop_build_job().unwrap();
        c.requeue(first);
        assert_eq!(c.pop_build_job().map(|j| j.building()), Some(Some(BuildingType::Quarry)));
    }

    #[test]
    fn test_orders_cleared_after_batch() {
        let mut c = Construction::new();
        c.record_order(MapPoint::new(1, 1), BuildingType::Farm);
        assert_eq!(c.orders().len(), 1);
        c.constructions_executed();
        assert!(c.orders().is_empty());
    }
}
