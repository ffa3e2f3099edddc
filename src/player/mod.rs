//! The autonomous player
//!
//! [`AiPlayer`] owns everything one agent knows: the cached node map, the
//! resource maps, the job queues, the event queue and the random
//! generator. [`AiPlayer::run_gf`] is called once per game frame and does
//! a bounded amount of work; expensive routines are staggered by player
//! id so agents sharing a frame do not all run them at once.

pub mod economy;
pub mod handlers;
pub mod planning;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::construction::{Construction, Job, SearchMode};
use crate::core::config::{AiConfig, AiLevel};
use crate::core::error::{AiError, Result};
use crate::core::types::{BuildingType, Gf, PlayerId};
use crate::events::{Event, EventQueue};
use crate::map::node::NodeMap;
use crate::map::point::{Direction, MapPoint};
use crate::planner::BuildingPlanner;
use crate::resources::ResourceMaps;
use crate::world::notify::NodeNoteKind;
use crate::world::{Command, GameWorld, Note, Subscription};

/// Frame at which a lonely agent says hello
const GREETING_GF: Gf = 100;
/// Demand is recomputed this often
const WANTED_INTERVAL: Gf = 100;
/// Offset between the land and the sea attack schedule
const SEA_ATTACK_OFFSET: Gf = 41;
const UPGRADE_INTERVAL: Gf = 73;
const CHECK_INTERVAL: Gf = 1500;
const SETTINGS_INTERVAL: Gf = 150;
/// Sawmills kept even when idle
const MIN_SAWMILLS: usize = 3;

/// One autonomous player
#[derive(Debug)]
pub struct AiPlayer {
    pub(crate) player: PlayerId,
    pub(crate) config: AiConfig,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) nodes: NodeMap,
    pub(crate) res_maps: ResourceMaps,
    pub(crate) planner: BuildingPlanner,
    pub(crate) construction: Construction,
    pub(crate) events: EventQueue,
    /// Inland watchtower or fortress where soldiers get trained
    pub(crate) upgrade_bld_pos: Option<MapPoint>,
    subscription: Subscription,
    outdated_bq: Vec<MapPoint>,
    defeated: bool,
    initialized: bool,
    settle_counter: u32,
}

impl AiPlayer {
    /// Create the agent for `player` and subscribe it to the world
    pub fn new<W: GameWorld>(world: &W, config: &AiConfig, player: PlayerId) -> Result<Self> {
        config.validate().map_err(AiError::InvalidConfig)?;
        let seed = config.seed ^ (player.0 as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let nodes = NodeMap::new(world, player);
        let res_maps = ResourceMaps::new(world, player, &nodes);
        info!(player = player.0, level = %config.level, "autonomous player created");
        Ok(Self {
            player,
            config: config.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            nodes,
            res_maps,
            planner: BuildingPlanner::new(),
            construction: Construction::new(),
            events: EventQueue::new(),
            upgrade_bld_pos: None,
            subscription: world.notifications().subscribe(),
            outdated_bq: Vec::new(),
            defeated: false,
            initialized: false,
            settle_counter: 0,
        })
    }

    /// Create an agent from a numeric difficulty level
    pub fn with_level<W: GameWorld>(world: &W, level: u8, player: PlayerId) -> Result<Self> {
        let level = AiLevel::try_from(level)?;
        Self::new(world, &AiConfig::new(level), player)
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn level(&self) -> AiLevel {
        self.config.level
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn resource_maps(&self) -> &ResourceMaps {
        &self.res_maps
    }

    pub fn planner(&self) -> &BuildingPlanner {
        &self.planner
    }

    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Queue an event the world does not announce itself
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Advance the agent by one game frame
    pub fn run_gf<W: GameWorld>(&mut self, world: &mut W, gf: Gf, is_nwf: bool) {
        if self.defeated || self.test_defeat(world) {
            return;
        }
        if !self.initialized {
            self.init_store_and_military(world);
            self.init_distribution(world);
            self.initialized = true;
        }
        if self.settle_counter < self.config.settle_ticks {
            self.settle_counter += 1;
            return;
        }

        if gf == GREETING_GF
            && world.military_buildings(self.player).is_empty()
            && world.warehouses(self.player).len() < 2
        {
            world.issue(
                self.player,
                Command::chat("Hi, I'm an artificial player and I'm not very good yet!"),
            );
        }

        self.poll_notifications(world);
        self.refresh_outdated_bq(world);

        self.planner.update(world, self.player, self.construction.orders());
        if is_nwf {
            self.construction.constructions_executed();
        }
        if gf % WANTED_INTERVAL == 0 {
            self.planner.update_buildings_wanted(world, self.player);
        }
        self.execute_ai_job(world);

        let id = self.player.index();
        let (attack_interval, build_interval) = self.config.level.intervals();
        if (gf + id * 17) % attack_interval == 0 {
            self.try_to_attack(world);
        }
        if (gf + id * 17) % UPGRADE_INTERVAL == 0 && self.config.level != AiLevel::Easy {
            self.mil_upgrade_optim(world);
        }
        if (gf + SEA_ATTACK_OFFSET + id * 17) % attack_interval == 0
            && world.game_settings().sea_attack
        {
            self.try_sea_attack(world);
        }
        if (gf + id * 13) % CHECK_INTERVAL == 0 {
            self.check_expeditions(world);
            self.check_forester(world);
            self.check_granite_mine(world);
        }
        if (gf + id * 11) % SETTINGS_INTERVAL == 0 {
            self.adjust_settings(world);
            self.burn_idle_sawmills(world);
        }
        if (gf + id * 7) % build_interval == 0 {
            self.check_for_unconnected_building_sites(world);
            self.plan_new_buildings(world, gf);
        }
    }

    /// Surrender once the last warehouse is gone
    ///
    /// Only checked after the settling phase. Returns whether the agent is
    /// now defeated.
    pub fn test_defeat<W: GameWorld>(&mut self, world: &mut W) -> bool {
        if self.defeated {
            return true;
        }
        if self.settle_counter < self.config.settle_ticks
            || !world.warehouses(self.player).is_empty()
        {
            return false;
        }
        warn!(player = self.player.0, "no warehouse left, surrendering");
        self.defeated = true;
        world.issue(self.player, Command::Surrender);
        world.issue(self.player, Command::chat("You win"));
        true
    }

    /// Handle queued events, then run jobs. Returns `(events, jobs)` handled.
    pub(crate) fn execute_ai_job<W: GameWorld>(&mut self, world: &mut W) -> (usize, usize) {
        let events = self.events.drain_quota(self.config.event_quota);
        let handled = events.len();
        for event in events {
            self.handle_event(world, event);
        }
        let quota = self.job_quota(world);
        let jobs = self.execute_jobs(world, quota);
        if handled > 0 || jobs > 0 {
            trace!(player = self.player.0, events = handled, jobs, quota, "ai round");
        }
        (handled, jobs)
    }

    /// `min(job_quota_cap, warehouses + military buildings)`
    pub fn job_quota<W: GameWorld>(&self, world: &W) -> usize {
        let size =
            world.warehouses(self.player).len() + world.military_buildings(self.player).len();
        size.min(self.config.job_quota_cap)
    }

    fn init_store_and_military<W: GameWorld>(&mut self, world: &W) {
        for bld in world.buildings(self.player) {
            if matches!(bld.kind, BuildingType::Farm | BuildingType::Charburner) {
                self.nodes.set_farmed(bld.pos, true);
            }
        }
        self.update_upgrade_building(world);
    }

    /// Turn pending notes into events and outdated building qualities
    fn poll_notifications<W: GameWorld>(&mut self, world: &W) {
        let size = world.map_size();
        for note in self.subscription.drain() {
            match note {
                Note::Node { pos, kind } => {
                    let radius = match kind {
                        NodeNoteKind::Bq => 1,
                        NodeNoteKind::Owner => 2,
                    };
                    self.outdated_bq.extend(size.points_in_radius(pos, radius));
                }
                other => {
                    if let Some(event) = Event::from_note(&other, self.player) {
                        self.events.push(event);
                    }
                }
            }
        }
    }

    fn refresh_outdated_bq<W: GameWorld>(&mut self, world: &W) {
        if self.outdated_bq.is_empty() {
            return;
        }
        self.outdated_bq.sort_unstable();
        self.outdated_bq.dedup();
        let pts = std::mem::take(&mut self.outdated_bq);
        self.nodes.refresh_bq(world, &pts);
    }

    /// Burn sawmills that neither work nor wait for boards, keeping three
    fn burn_idle_sawmills<W: GameWorld>(&mut self, world: &mut W) {
        let sawmills: Vec<_> = world
            .buildings(self.player)
            .into_iter()
            .filter(|b| b.kind == BuildingType::Sawmill)
            .collect();
        if sawmills.len() <= MIN_SAWMILLS {
            return;
        }
        let size = world.map_size();
        let mut burned = 0;
        for mill in sawmills.iter() {
            if sawmills.len() - burned <= MIN_SAWMILLS {
                break;
            }
            if mill.productivity < 1 && mill.has_worker && mill.wares < 1 && !mill.ordered_wares {
                debug!(player = self.player.0, pos = %mill.pos, "burning idle sawmill");
                world.issue(self.player, Command::DestroyBuilding { pos: mill.pos });
                let flag = size.neighbor(mill.pos, Direction::SouthEast);
                self.remove_unused_road(world, flag, Some(Direction::NorthWest), true, true, false);
                burned += 1;
            }
        }
    }

    /// Queue a connect job for `flag`
    pub(crate) fn add_connect_job(&mut self, flag: MapPoint) -> bool {
        self.construction.add_connect_job(Job::connect(flag))
    }

    /// Queue a build job around `pt` if one more `kind` is wanted
    pub(crate) fn add_build_job(&mut self, kind: BuildingType, pt: MapPoint, front: bool) -> bool {
        self.add_build_job_with(kind, pt, front, SearchMode::Radius)
    }

    pub(crate) fn add_build_job_with(
        &mut self,
        kind: BuildingType,
        pt: MapPoint,
        front: bool,
        search: SearchMode,
    ) -> bool {
        if !self.planner.wanted(kind) {
            trace!(player = self.player.0, ?kind, "build job rejected, not wanted");
            return false;
        }
        self.construction.add_build_job(Job::build(kind, pt, search), front)
    }

    /// Queue the military building that suits `pt` best
    pub(crate) fn add_military_build_job<W: GameWorld>(&mut self, world: &W, pt: MapPoint) -> bool {
        match self.choose_military_building(world, pt) {
            Some(kind) => self.add_build_job(kind, pt, false),
            None => false,
        }
    }

    /// Random index below `len`; `len` must not be zero
    pub(crate) fn random_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);

    fn colony() -> SimWorld {
        let mut world = SimWorld::new(40, 40);
        world.claim(ME, MapPoint::new(20, 20), 10);
        world.add_building(ME, MapPoint::new(20, 20), BuildingType::Headquarters);
        world
    }

    fn settled(world: &mut SimWorld, config: &AiConfig) -> AiPlayer {
        let mut ai = AiPlayer::new(world, config, ME).unwrap();
        for gf in 1..=config.settle_ticks + 1 {
            ai.run_gf(world, gf, false);
        }
        ai
    }

    #[test]
    fn test_invalid_level_refused() {
        let world = colony();
        assert!(matches!(AiPlayer::with_level(&world, 7, ME), Err(AiError::InvalidLevel(_))));
        assert_eq!(AiPlayer::with_level(&world, 2, ME).unwrap().level(), AiLevel::Hard);
    }

    #[test]
    fn test_invalid_config_refused() {
        let world = colony();
        let config = AiConfig { job_quota_cap: 0, ..AiConfig::default() };
        assert!(matches!(AiPlayer::new(&world, &config, ME), Err(AiError::InvalidConfig(_))));
    }

    #[test]
    fn test_first_tick_sends_distribution() {
        let mut world = colony();
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        ai.run_gf(&mut world, 1, false);
        let distribution = world.distribution(ME).unwrap();
        assert_eq!(distribution[17], 4);
        assert_eq!(distribution[18], 2);
        assert_eq!(distribution[0], 10);
    }

    #[test]
    fn test_defeat_after_settling_without_warehouse() {
        let mut world = SimWorld::new(20, 20);
        let config = AiConfig::default();
        let mut ai = AiPlayer::new(&world, &config, ME).unwrap();
        for gf in 0..config.settle_ticks {
            ai.run_gf(&mut world, gf, false);
            assert!(!ai.is_defeated());
        }
        ai.run_gf(&mut world, 50, false);
        assert!(ai.is_defeated());
        assert!(world.has_surrendered(ME));
        let issued = world.commands_of(ME).len();
        ai.run_gf(&mut world, 51, false);
        assert_eq!(world.commands_of(ME).len(), issued);
    }

    #[test]
    fn test_greeting_when_alone() {
        let mut world = colony();
        let mut ai = settled(&mut world, &AiConfig::default());
        ai.run_gf(&mut world, GREETING_GF, false);
        assert!(world
            .commands_of(ME)
            .iter()
            .any(|c| matches!(c, Command::Chat { message } if message.starts_with("Hi"))));
    }

    #[test]
    fn test_job_quota_follows_colony_size() {
        let mut world = colony();
        let mut ai = settled(&mut world, &AiConfig::default());
        assert_eq!(ai.job_quota(&world), 1);
        for x in [10u16, 14, 26] {
            world.add_building(ME, MapPoint::new(x, 24), BuildingType::Barracks);
        }
        assert_eq!(ai.job_quota(&world), 4);

        for x in 0..3u16 {
            ai.add_connect_job(MapPoint::new(12 + 2 * x, 14));
        }
        world.clear_commands();
        let (_, jobs) = ai.execute_ai_job(&mut world);
        assert!(jobs <= ai.job_quota(&world));
    }

    #[test]
    fn test_quota_capped() {
        let mut world = colony();
        let config = AiConfig { job_quota_cap: 2, ..AiConfig::default() };
        let ai = AiPlayer::new(&world, &config, ME).unwrap();
        for x in [10u16, 14, 26, 30] {
            world.add_building(ME, MapPoint::new(x, 24), BuildingType::Barracks);
        }
        assert_eq!(ai.job_quota(&world), 2);
    }

    #[test]
    fn test_event_quota_keeps_backlog() {
        let mut world = colony();
        let mut ai = settled(&mut world, &AiConfig::default());
        for x in 0..15u16 {
            ai.push_event(Event::new(
                MapPoint::new(x, 2),
                EventKind::ResourceFound(crate::world::SubsurfaceResource::Coal),
            ));
        }
        let (handled, _) = ai.execute_ai_job(&mut world);
        assert_eq!(handled, 10);
        assert_eq!(ai.pending_events(), 5);
    }

    #[test]
    fn test_notes_become_events() {
        let mut world = colony();
        let mut ai = settled(&mut world, &AiConfig::default());
        world.publish(Note::Ship {
            player: ME,
            pos: MapPoint::new(3, 3),
            ship: crate::core::types::ShipId(4),
        });
        world.publish(Note::Ship {
            player: PlayerId(1),
            pos: MapPoint::new(3, 3),
            ship: crate::core::types::ShipId(5),
        });
        ai.poll_notifications(&world);
        assert_eq!(ai.pending_events(), 1);
    }

    #[test]
    fn test_build_job_needs_demand() {
        let mut world = colony();
        let mut ai = settled(&mut world, &AiConfig::default());
        assert!(!ai.add_build_job(BuildingType::Mint, MapPoint::new(20, 20), false));
        ai.planner.update_buildings_wanted(&world, ME);
        assert!(ai.add_build_job(BuildingType::Woodcutter, MapPoint::new(20, 20), false));
        assert!(!ai.add_build_job(BuildingType::Woodcutter, MapPoint::new(20, 20), false));
    }
}
