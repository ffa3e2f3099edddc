//! Build and connect jobs
//!
//! A job advances one state per invocation. Non-terminal jobs go back into
//! their queue; terminal ones are dropped by the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::types::BuildingType;
use crate::map::point::{Direction, MapPoint};
use crate::player::AiPlayer;
use crate::world::{Command, GameWorld, NodeObject};

/// Retry budget of a node whose road connection failed
pub const FAILED_ROAD_PENALTY: u32 = 20;

/// How many times a build job picks a new spot after a failed connection
const MAX_CONNECT_RETRIES: u8 = 1;

/// Where a build job looks for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    /// Around the job's reference point only
    Radius,
    /// Around the reference point, then around every warehouse
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Build {
        building: BuildingType,
        around: MapPoint,
        search: SearchMode,
    },
    Connect {
        flag: MapPoint,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Init,
    SearchPosition,
    WaitBuildingSite,
    /// Road work, numbered from 1
    ExecutingRoad(u8),
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    pub state: JobState,
    /// Chosen site of a build job
    pub target: Option<MapPoint>,
    /// Scripted order that bypasses the demand check
    pub forced: bool,
    retries: u8,
}

impl Job {
    pub fn build(building: BuildingType, around: MapPoint, search: SearchMode) -> Self {
        Self {
            kind: JobKind::Build { building, around, search },
            state: JobState::Init,
            target: None,
            forced: false,
            retries: 0,
        }
    }

    pub fn connect(flag: MapPoint) -> Self {
        Self {
            kind: JobKind::Connect { flag },
            state: JobState::Init,
            target: None,
            forced: false,
            retries: 0,
        }
    }

    /// Job for a site that was already placed; only the road is missing
    pub fn placed(building: BuildingType, pos: MapPoint) -> Self {
        Self {
            kind: JobKind::Build { building, around: pos, search: SearchMode::Radius },
            state: JobState::ExecutingRoad(1),
            target: Some(pos),
            forced: true,
            retries: MAX_CONNECT_RETRIES,
        }
    }

    pub fn building(&self) -> Option<BuildingType> {
        match self.kind {
            JobKind::Build { building, .. } => Some(building),
            JobKind::Connect { .. } => None,
        }
    }

    /// Same building around the same point, or the same flag
    pub fn same_task(&self, other: &Job) -> bool {
        match (self.kind, other.kind) {
            (
                JobKind::Build { building: a, around: pa, .. },
                JobKind::Build { building: b, around: pb, .. },
            ) => a == b && pa == pb,
            (JobKind::Connect { flag: a }, JobKind::Connect { flag: b }) => a == b,
            _ => false,
        }
    }
}

impl AiPlayer {
    /// Advance `job` by one state
    pub(crate) fn execute_job<W: GameWorld>(&mut self, world: &mut W, job: &mut Job) {
        let before = job.state;
        match job.kind {
            JobKind::Build { building, around, search } => {
                self.step_build_job(world, job, building, around, search)
            }
            JobKind::Connect { flag } => self.step_connect_job(world, job, flag),
        }
        trace!(player = self.player.0, ?before, after = ?job.state, "job step");
        debug_assert!(job.state != before || job.state.is_terminal());
    }

    fn step_build_job<W: GameWorld>(
        &mut self,
        world: &mut W,
        job: &mut Job,
        building: BuildingType,
        around: MapPoint,
        search: SearchMode,
    ) {
        match job.state {
            JobState::Init => {
                if !world.can_build(self.player, building) {
                    job.state = JobState::Failed;
                } else if !job.forced && !self.planner.wanted(building) {
                    debug!(player = self.player.0, ?building, "build job no longer wanted");
                    job.state = JobState::Failed;
                } else {
                    job.state = JobState::SearchPosition;
                }
            }
            JobState::SearchPosition => {
                let found = match search {
                    SearchMode::Radius => {
                        self.find_position_for_building_around(world, building, around)
                    }
                    SearchMode::Global => self.find_position_globally(world, building, around),
                };
                let Some(pos) = found else {
                    trace!(player = self.player.0, ?building, %around, "no site found");
                    job.state = JobState::Failed;
                    return;
                };
                if !world.issue(self.player, Command::build(building, pos)) {
                    debug!(player = self.player.0, ?building, %pos, "building site rejected");
                    job.state = JobState::Failed;
                    return;
                }
                self.construction.record_order(pos, building);
                self.nodes.update_nodes_around(world, pos, 3);
                job.target = Some(pos);
                job.state = JobState::WaitBuildingSite;
            }
            JobState::WaitBuildingSite => {
                let placed = job.target.is_some_and(|pos| {
                    matches!(
                        world.object_at(pos),
                        NodeObject::BuildingSite { owner, kind }
                            | NodeObject::Building { owner, kind }
                            if owner == self.player && kind == building
                    )
                });
                job.state = if placed { JobState::ExecutingRoad(1) } else { JobState::Failed };
            }
            JobState::ExecutingRoad(1) => self.build_main_road(world, job, building),
            JobState::ExecutingRoad(_) => {
                if let Some(pos) = job.target {
                    let flag = world.map_size().neighbor(pos, Direction::SouthEast);
                    self.build_secondary_road(world, flag);
                }
                job.state = JobState::Finished;
            }
            JobState::Finished | JobState::Failed => {}
        }
    }

    /// Connect the site's flag. A site that cannot be connected is torn
    /// down and the search starts over once.
    fn build_main_road<W: GameWorld>(
        &mut self,
        world: &mut W,
        job: &mut Job,
        building: BuildingType,
    ) {
        let Some(pos) = job.target else {
            job.state = JobState::Failed;
            return;
        };
        if !world.object_at(pos).is_building_or_site() {
            job.state = JobState::Failed;
            return;
        }
        let flag = world.map_size().neighbor(pos, Direction::SouthEast);
        if !self.is_connected_to_road_system(world, flag) {
            match self.connect_flag_to_road_system(world, flag) {
                Some(route) => self.nodes.recalc_ground(pos, &route),
                None => {
                    debug!(player = self.player.0, ?building, %pos, "site could not be connected");
                    world.issue(self.player, Command::DestroyFlag { pos: flag });
                    let node = self.nodes.get_mut(pos);
                    node.reachable = false;
                    node.failed_penalty = FAILED_ROAD_PENALTY;
                    if job.retries < MAX_CONNECT_RETRIES {
                        job.retries += 1;
                        job.target = None;
                        job.state = JobState::SearchPosition;
                    } else {
                        job.state = JobState::Failed;
                    }
                    return;
                }
            }
        }
        if matches!(building, BuildingType::Farm | BuildingType::Charburner) {
            self.nodes.set_farmed(pos, true);
        }
        job.state = JobState::ExecutingRoad(2);
    }

    fn step_connect_job<W: GameWorld>(&mut self, world: &mut W, job: &mut Job, flag: MapPoint) {
        match job.state {
            JobState::Init | JobState::SearchPosition | JobState::WaitBuildingSite => {
                let own = world.flag(flag).is_some_and(|f| f.owner == self.player);
                job.state = if !own {
                    JobState::Failed
                } else if self.is_connected_to_road_system(world, flag) {
                    JobState::Finished
                } else {
                    JobState::ExecutingRoad(1)
                };
            }
            JobState::ExecutingRoad(_) => {
                job.state = match self.connect_flag_to_road_system(world, flag) {
                    Some(_) => JobState::Finished,
                    None => {
                        trace!(player = self.player.0, %flag, "flag could not be connected");
                        JobState::Failed
                    }
                };
            }
            JobState::Finished | JobState::Failed => {}
        }
    }

    /// Run queued jobs: up to five connect jobs, then up to five build jobs,
    /// never more than `quota` in total. Returns how many ran.
    pub(crate) fn execute_jobs<W: GameWorld>(&mut self, world: &mut W, quota: usize) -> usize {
        let mut executed = 0;
        let connects = self
            .construction
            .connect_job_count()
            .min(crate::construction::MAX_JOBS_PER_KIND);
        for _ in 0..connects {
            if executed >= quota {
                return executed;
            }
            let Some(mut job) = self.construction.pop_connect_job() else {
                break;
            };
            self.execute_job(world, &mut job);
            executed += 1;
            if !job.state.is_terminal() {
                self.construction.requeue(job);
            }
        }
        let builds = self
            .construction
            .build_job_count()
            .min(crate::construction::MAX_JOBS_PER_KIND);
        for _ in 0..builds {
            if executed >= quota {
                break;
            }
            let Some(mut job) = self.construction.pop_build_job() else {
                break;
            };
            self.execute_job(world, &mut job);
            executed += 1;
            if !job.state.is_terminal() {
                self.construction.requeue(job);
            }
        }
        executed
    }
}
