//! Reactions to events
//!
//! One handler per [`EventKind`]. Handlers queue jobs, issue commands and
//! keep the node map current around the affected point; none of them
//! blocks or waits for an outcome.

use rand::Rng;
use tracing::{debug, info, trace};

use crate::construction::{Job, SearchMode};
use crate::core::types::{BuildingType, FrontierDistance, ShipId};
use crate::events::{Event, EventKind};
use crate::map::point::{Direction, MapPoint};
use crate::military::NUM_SOLDIER_RANKS;
use crate::player::AiPlayer;
use crate::resources::AiResource;
use crate::world::{Command, GameWorld, NodeObject, ShipDirection, ShipInfo};

/// Warehouses closer than this make another storehouse pointless
const STOREHOUSE_SPACING: u32 = 20;
/// A finished ship belongs to the closest shipyard within this distance
const SHIPYARD_RADIUS: u32 = 12;
/// Radius refreshed after border or resource changes
const CHANGE_RADIUS: u32 = 11;
/// Roads shorter than this get no extra flags
const MIN_FLAGGED_ROAD: u32 = 4;

/// Built around every newly occupied military building if wanted
const AROUND_NEW_MILITARY: [BuildingType; 11] = [
    BuildingType::Storehouse,
    BuildingType::Woodcutter,
    BuildingType::Quarry,
    BuildingType::GoldMine,
    BuildingType::CoalMine,
    BuildingType::IronMine,
    BuildingType::GraniteMine,
    BuildingType::Fishery,
    BuildingType::Farm,
    BuildingType::Hunter,
    BuildingType::Forester,
];

impl AiPlayer {
    pub(crate) fn handle_event<W: GameWorld>(&mut self, world: &mut W, event: Event) {
        trace!(player = self.player.0, pos = %event.pos, kind = ?event.kind, "handling event");
        let pos = event.pos;
        match event.kind {
            EventKind::BuildingConquered(_) | EventKind::MilitaryOccupied(_) => {
                self.handle_new_military_building_occupied(world, pos)
            }
            EventKind::BuildingDestroyed(kind) => self.handle_building_destroyed(world, pos, kind),
            EventKind::BuildingLost(_) | EventKind::LostLand(_) => {
                self.handle_lost_land(world, pos)
            }
            EventKind::NoMoreResourcesReachable(kind) => {
                self.handle_no_more_resources_reachable(world, pos, kind)
            }
            EventKind::BuildingFinished(kind) => self.handle_building_finished(world, pos, kind),
            EventKind::BorderChanged(_) => self.handle_border_changed(world, pos),
            EventKind::LuaConstructionOrder { building, forced } => {
                self.execute_lua_construction_order(world, pos, building, forced)
            }
            EventKind::ExpeditionWaiting(ship) => self.handle_expedition_at(world, pos, ship),
            EventKind::NewColonyFounded => {
                let flag = world.map_size().neighbor(pos, Direction::SouthEast);
                self.add_connect_job(flag);
            }
            EventKind::ResourceFound(_) => {
                self.res_maps.update_all_around(world, self.player, &self.nodes, pos, 2);
            }
            EventKind::RoadConstructionComplete(dir) => {
                self.handle_road_construction_complete(world, pos, dir)
            }
            EventKind::RoadConstructionFailed(_) => {
                self.handle_road_construction_failed(world, pos)
            }
            EventKind::ShipBuilt(_) => self.handle_ship_built(world, pos),
            EventKind::TreeChopped => self.handle_tree_chopped(world, pos),
        }
    }

    fn handle_new_military_building_occupied<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        self.remove_all_unused_roads(world, pt);
        self.planner.update_buildings_wanted(world, self.player);
        let military = world.military_buildings(self.player);
        let Some(mil) = military.into_iter().find(|m| m.pos == pt) else {
            return;
        };
        if mil.frontier != FrontierDistance::Far {
            if mil.gold_disabled {
                world.issue(self.player, Command::SetCoinsAllowed { pos: pt, enabled: true });
            }
        } else if matches!(mil.kind, BuildingType::Barracks | BuildingType::Guardhouse)
            && Some(mil.kind) != self.biggest_allowed_military(world)
            && !mil.gold_disabled
        {
            world.issue(self.player, Command::SetCoinsAllowed { pos: pt, enabled: false });
        }

        self.add_build_job(BuildingType::HarborBuilding, pt, false);
        if !self.is_invalid_shipyard_position(world, pt) {
            self.add_build_job(BuildingType::Shipyard, pt, false);
        }
        if self.soldier_available(world, None) > 0 {
            self.add_military_build_job(world, pt);
        }

        let size = world.map_size();
        let store_nearby = world
            .warehouses(self.player)
            .iter()
            .map(|wh| wh.pos)
            .chain(
                world
                    .building_sites(self.player)
                    .iter()
                    .filter(|s| s.kind.is_warehouse())
                    .map(|s| s.pos),
            )
            .any(|p| size.distance(p, pt) < STOREHOUSE_SPACING);
        let start = usize::from(store_nearby);
        for &kind in &AROUND_NEW_MILITARY[start..] {
            if self.planner.wanted(kind) {
                self.add_build_job(kind, pt, false);
            }
        }
    }

    fn handle_building_destroyed<W: GameWorld>(
        &mut self,
        world: &mut W,
        pt: MapPoint,
        kind: BuildingType,
    ) {
        match kind {
            BuildingType::Farm | BuildingType::Charburner => self.nodes.set_farmed(pt, false),
            BuildingType::HarborBuilding => {
                // Clear the spot so the harbor can be rebuilt
                let size = world.map_size();
                for cur in size.points_in_radius(pt, 2) {
                    match world.object_at(cur) {
                        NodeObject::Building { owner, .. } if owner == self.player => {
                            world.issue(self.player, Command::DestroyBuilding { pos: cur });
                        }
                        NodeObject::BuildingSite { owner, .. } if owner == self.player => {
                            let flag = size.neighbor(cur, Direction::SouthEast);
                            world.issue(self.player, Command::DestroyFlag { pos: flag });
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_lost_land<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        if world.warehouses(self.player).is_empty() {
            return;
        }
        self.remove_all_unused_roads(world, pt);
    }

    fn handle_building_finished<W: GameWorld>(
        &mut self,
        world: &mut W,
        pt: MapPoint,
        kind: BuildingType,
    ) {
        match kind {
            BuildingType::HarborBuilding => {
                self.nodes.update_nodes_around(world, pt, 8);
                self.remove_all_unused_roads(world, pt);
                world.issue(self.player, Command::ChangeReserve { pos: pt, rank: 0, count: 1 });
                if self.harbor_pos_relevant(world, pt, true) {
                    info!(player = self.player.0, %pt, "starting expedition");
                    world.issue(self.player, Command::StartStopExpedition { pos: pt, start: true });
                }
            }
            BuildingType::Shipyard => {
                world.issue(self.player, Command::SetShipYardMode { pos: pt, ships: true });
            }
            BuildingType::Woodcutter => {
                self.add_build_job_with(BuildingType::Sawmill, pt, false, SearchMode::Global);
            }
            _ => {}
        }
    }

    /// Tear down a building that ran dry and try something else there
    ///
    /// A woodcutter stays when it is one of the two closest to a forester
    /// nearby.
    fn handle_no_more_resources_reachable<W: GameWorld>(
        &mut self,
        world: &mut W,
        pt: MapPoint,
        kind: BuildingType,
    ) {
        let owned = matches!(
            world.object_at(pt),
            NodeObject::Building { owner, .. } if owner == self.player
        );
        if !owned {
            return;
        }
        let size = world.map_size();
        if kind == BuildingType::Woodcutter {
            let wood_radius = AiResource::Wood.radius();
            let buildings = world.buildings(self.player);
            let woodcutters: Vec<MapPoint> = buildings
                .iter()
                .filter(|b| b.kind == BuildingType::Woodcutter && b.pos != pt)
                .map(|b| b.pos)
                .collect();
            for forester in buildings.iter().filter(|b| b.kind == BuildingType::Forester) {
                let max_dist = size.distance(pt, forester.pos);
                if max_dist > wood_radius {
                    continue;
                }
                let better = woodcutters
                    .iter()
                    .filter(|&&w| size.distance(w, pt) <= wood_radius)
                    .filter(|&&w| size.distance(w, forester.pos) <= max_dist)
                    .take(2)
                    .count();
                if better < 2 {
                    trace!(player = self.player.0, %pt, "keeping woodcutter next to forester");
                    return;
                }
            }
        }

        debug!(player = self.player.0, %pt, ?kind, "no more resources, destroying");
        world.issue(self.player, Command::DestroyBuilding { pos: pt });
        if kind == BuildingType::Fishery {
            self.res_maps.get_mut(AiResource::Fish).avoid_position(pt);
        }
        self.nodes.update_nodes_around(world, pt, CHANGE_RADIUS);
        let flag = size.neighbor(pt, Direction::SouthEast);
        self.remove_unused_road(world, flag, Some(Direction::NorthWest), true, true, false);

        self.add_military_build_job(world, pt);
        if kind != BuildingType::Hunter {
            self.add_build_job(kind, pt, false);
        }
        self.add_build_job(BuildingType::Farm, pt, false);
    }

    fn handle_border_changed<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        self.nodes.update_nodes_around(world, pt, CHANGE_RADIUS);
        let military = world.military_buildings(self.player);
        let Some(mil) = military.into_iter().find(|m| m.pos == pt) else {
            return;
        };
        if mil.frontier != FrontierDistance::Far {
            if mil.gold_disabled {
                world.issue(self.player, Command::SetCoinsAllowed { pos: pt, enabled: true });
            }
            let max = mil.max_troops();
            for rank in 0..NUM_SOLDIER_RANKS {
                if mil.troop_limits[rank as usize] != max {
                    world.issue(self.player, Command::SetTroopLimit { pos: pt, rank, limit: max });
                }
            }
        }
        if Some(mil.kind) != self.biggest_allowed_military(world) {
            self.add_military_build_job(world, pt);
        }
    }

    /// Scripted construction order
    ///
    /// Forced orders place the site right away and only queue the road;
    /// other orders go to the front of the queue if the type is wanted.
    fn execute_lua_construction_order<W: GameWorld>(
        &mut self,
        world: &mut W,
        pt: MapPoint,
        kind: BuildingType,
        forced: bool,
    ) {
        if !world.can_build(self.player, kind) {
            return;
        }
        if forced {
            world.issue(self.player, Command::build(kind, pt));
            self.construction.record_order(pt, kind);
            self.construction.add_build_job(Job::placed(kind, pt), true);
        } else if self.planner.wanted(kind) {
            self.construction.add_build_job(Job::build(kind, pt, SearchMode::Radius), true);
        }
    }

    fn handle_expedition_at<W: GameWorld>(
        &mut self,
        world: &mut W,
        pt: MapPoint,
        ship: Option<ShipId>,
    ) {
        let waiting = world.ships(self.player).into_iter().find(|s| {
            s.waiting_for_expedition
                && match ship {
                    Some(id) => s.id == id,
                    None => s.pos == pt,
                }
        });
        if let Some(ship) = waiting {
            self.handle_expedition(world, &ship);
        }
    }

    /// Found a colony, or explore starting in a random direction
    pub(crate) fn handle_expedition<W: GameWorld>(&mut self, world: &mut W, ship: &ShipInfo) {
        if !ship.waiting_for_expedition {
            return;
        }
        if ship.can_found_colony {
            info!(player = self.player.0, pos = %ship.pos, "founding colony");
            world.issue(self.player, Command::FoundColony { ship: ship.id });
            return;
        }
        let offset = self.rng.gen_range(0..ShipDirection::ALL.len());
        for i in 0..ShipDirection::ALL.len() {
            let dir = ShipDirection::ALL[(i + offset) % ShipDirection::ALL.len()];
            if world.is_exploration_direction_possible(ship.id, dir) {
                world.issue(self.player, Command::TravelToNextSpot { ship: ship.id, dir });
                return;
            }
        }
        debug!(
            player = self.player.0,
            ship = ship.id.0,
            "nowhere to explore, cancelling expedition"
        );
        world.issue(self.player, Command::CancelExpedition { ship: ship.id });
    }

    fn handle_tree_chopped<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        self.nodes.get_mut(pt).reachable = true;
        self.nodes.update_nodes_around(world, pt, 3);
        if self.rng.gen_bool(0.5) {
            self.add_military_build_job(world, pt);
        } else {
            self.add_build_job(BuildingType::Woodcutter, pt, false);
        }
    }

    /// Long roads get a flag on every second node
    ///
    /// Roads touching a warehouse are flagged from the warehouse end.
    fn handle_road_construction_complete<W: GameWorld>(
        &mut self,
        world: &mut W,
        pt: MapPoint,
        dir: Direction,
    ) {
        let Some(flag) = world.flag(pt) else {
            return;
        };
        let Some(&road) = flag.route(dir) else {
            return;
        };
        if road.length < MIN_FLAGGED_ROAD {
            return;
        }
        if self.is_warehouse_flag(world, road.other_flag) {
            self.set_flags_along_road(world, road.other_flag, road.other_dir);
        } else {
            self.set_flags_along_road(world, pt, dir);
        }
    }

    fn handle_road_construction_failed<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        if !world.flag(pt).is_some_and(|f| f.owner == self.player) {
            return;
        }
        if self.remove_unused_road(world, pt, None, true, false, false) {
            self.add_connect_job(pt);
        }
    }

    /// Stop the shipyard that built this ship once there are enough ships
    fn handle_ship_built<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        let shipyards: Vec<MapPoint> = world
            .buildings(self.player)
            .into_iter()
            .filter(|b| b.kind == BuildingType::Shipyard)
            .map(|b| b.pos)
            .collect();
        let ships = world.ships(self.player).len();
        let want_more = match self.num_relevant_seas(world) {
            0 => false,
            1 => ships <= world.harbor_points().len(),
            _ => ships < (3 * shipyards.len()).min(7),
        };
        if want_more {
            return;
        }
        let size = world.map_size();
        let closest = shipyards
            .iter()
            .map(|&p| (size.distance(p, pt), p))
            .filter(|&(d, _)| d < SHIPYARD_RADIUS)
            .min();
        if let Some((_, pos)) = closest {
            debug!(player = self.player.0, %pos, "enough ships, stopping shipyard");
            world.issue(self.player, Command::SetProductionEnabled { pos, enabled: false });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::JobState;
    use crate::core::config::AiConfig;
    use crate::core::types::PlayerId;
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);

    fn colony() -> SimWorld {
        let mut world = SimWorld::new(48, 48);
        world.claim(ME, MapPoint::new(20, 20), 14);
        world.add_building(ME, MapPoint::new(20, 20), BuildingType::Headquarters);
        world
    }

    fn agent(world: &SimWorld) -> AiPlayer {
        let mut ai = AiPlayer::new(world, &AiConfig::default(), ME).unwrap();
        ai.planner.update(world, ME, &[]);
        ai.planner.update_buildings_wanted(world, ME);
        ai
    }

    fn count(world: &SimWorld, pred: impl Fn(&Command) -> bool) -> usize {
        world.commands_of(ME).into_iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn test_long_road_gets_flags() {
        let mut world = colony();
        let start = MapPoint::new(8, 30);
        world.add_road(ME, start, vec![Direction::East; 6]);
        let mut ai = agent(&world);
        let event = Event::new(start, EventKind::RoadConstructionComplete(Direction::East));
        ai.handle_event(&mut world, event);
        assert_eq!(count(&world, |c| matches!(c, Command::SetFlag { .. })), 2);
    }

    #[test]
    fn test_short_road_left_alone() {
        let mut world = colony();
        let start = MapPoint::new(8, 30);
        world.add_road(ME, start, vec![Direction::East; 3]);
        let mut ai = agent(&world);
        let event = Event::new(start, EventKind::RoadConstructionComplete(Direction::East));
        ai.handle_event(&mut world, event);
        assert_eq!(count(&world, |c| matches!(c, Command::SetFlag { .. })), 0);
    }

    #[test]
    fn test_failed_road_at_site_is_retried() {
        let mut world = colony();
        let site = MapPoint::new(26, 26);
        world.add_site(ME, site, BuildingType::Sawmill);
        let flag = world.map_size().neighbor(site, Direction::SouthEast);
        let mut ai = agent(&world);
        let event = Event::new(flag, EventKind::RoadConstructionFailed(Direction::East));
        ai.handle_event(&mut world, event);
        assert_eq!(ai.construction.connect_job_count(), 1);
    }

    #[test]
    fn test_failed_road_at_loose_flag_removes_it() {
        let mut world = colony();
        let flag = MapPoint::new(26, 26);
        world.add_flag(ME, flag);
        let mut ai = agent(&world);
        let event = Event::new(flag, EventKind::RoadConstructionFailed(Direction::East));
        ai.handle_event(&mut world, event);
        assert!(!world.has_flag(flag));
        assert_eq!(ai.construction.connect_job_count(), 0);
    }

    #[test]
    fn test_shipyard_stopped_without_relevant_seas() {
        let mut world = colony();
        world.add_building(ME, MapPoint::new(10, 10), BuildingType::Shipyard);
        let mut ai = agent(&world);
        let event = Event::new(MapPoint::new(12, 10), EventKind::ShipBuilt(ShipId(1)));
        ai.handle_event(&mut world, event);
        assert!(world.building(MapPoint::new(10, 10)).unwrap().production_disabled);
    }

    fn waiting_ship(can_found_colony: bool) -> ShipInfo {
        ShipInfo {
            id: ShipId(3),
            pos: MapPoint::new(5, 5),
            sea: 1,
            waiting_for_expedition: true,
            can_found_colony,
        }
    }

    #[test]
    fn test_expedition_founds_colony_when_possible() {
        let mut world = colony();
        world.add_ship(ME, waiting_ship(true));
        let mut ai = agent(&world);
        let event = Event::new(MapPoint::new(5, 5), EventKind::ExpeditionWaiting(Some(ShipId(3))));
        ai.handle_event(&mut world, event);
        assert_eq!(world.commands_of(ME), vec![&Command::FoundColony { ship: ShipId(3) }]);
    }

    #[test]
    fn test_expedition_explores_only_possible_direction() {
        let mut world = colony();
        world.add_ship(ME, waiting_ship(false));
        world.allow_exploration(ShipId(3), ShipDirection::SouthWest);
        let mut ai = agent(&world);
        let event = Event::new(MapPoint::new(5, 5), EventKind::ExpeditionWaiting(None));
        ai.handle_event(&mut world, event);
        assert_eq!(
            world.commands_of(ME),
            vec![&Command::TravelToNextSpot { ship: ShipId(3), dir: ShipDirection::SouthWest }]
        );
    }

    #[test]
    fn test_expedition_cancelled_when_stuck() {
        let mut world = colony();
        world.add_ship(ME, waiting_ship(false));
        let mut ai = agent(&world);
        let event = Event::new(MapPoint::new(5, 5), EventKind::ExpeditionWaiting(None));
        ai.handle_event(&mut world, event);
        assert_eq!(world.commands_of(ME), vec![&Command::CancelExpedition { ship: ShipId(3) }]);
    }

    #[test]
    fn test_forced_lua_order_places_site() {
        let mut world = colony();
        let mut ai = agent(&world);
        let pos = MapPoint::new(24, 24);
        ai.handle_event(
            &mut world,
            Event::new(
                pos,
                EventKind::LuaConstructionOrder { building: BuildingType::Mint, forced: true },
            ),
        );
        assert!(world.building(pos).is_some_and(|b| b.site && b.kind == BuildingType::Mint));
        let job = ai.construction.build_jobs().next().unwrap();
        assert_eq!(job.state, JobState::ExecutingRoad(1));
    }

    #[test]
    fn test_unwanted_lua_order_ignored() {
        let mut world = colony();
        let mut ai = agent(&world);
        ai.handle_event(
            &mut world,
            Event::new(
                MapPoint::new(24, 24),
                EventKind::LuaConstructionOrder { building: BuildingType::Mint, forced: false },
            ),
        );
        assert_eq!(ai.construction.build_job_count(), 0);
    }

    #[test]
    fn test_finished_woodcutter_asks_for_sawmill() {
        let mut world = colony();
        let mut ai = agent(&world);
        ai.handle_event(
            &mut world,
            Event::new(
                MapPoint::new(24, 24),
                EventKind::BuildingFinished(BuildingType::Woodcutter),
            ),
        );
        assert_eq!(
            ai.construction.build_jobs().next().and_then(Job::building),
            Some(BuildingType::Sawmill)
        );
    }

    #[test]
    fn test_destroyed_harbor_clears_spot() {
        let mut world = colony();
        let harbor = MapPoint::new(30, 20);
        world.add_building(ME, MapPoint::new(31, 21), BuildingType::Well);
        let mut ai = agent(&world);
        let event = Event::new(harbor, EventKind::BuildingDestroyed(BuildingType::HarborBuilding));
        ai.handle_event(&mut world, event);
        assert!(world.building(MapPoint::new(31, 21)).is_none());
    }

    #[test]
    fn test_interior_barracks_loses_coins_and_skips_storehouse() {
        let mut world = colony();
        let pos = MapPoint::new(26, 20);
        world.add_building(ME, pos, BuildingType::Barracks);
        let mut ai = agent(&world);
        let event = Event::new(pos, EventKind::MilitaryOccupied(BuildingType::Barracks));
        ai.handle_event(&mut world, event);
        assert!(world.building(pos).unwrap().gold_disabled);
        let queued: Vec<_> = ai.construction.build_jobs().filter_map(|j| j.building()).collect();
        assert!(!queued.contains(&BuildingType::Storehouse));
        assert!(queued.contains(&BuildingType::Woodcutter));
    }

    #[test]
    fn test_frontier_border_change_fills_troops() {
        let mut world = colony();
        let pos = MapPoint::new(26, 20);
        let tower = world.add_building(ME, pos, BuildingType::Fortress);
        tower.frontier = FrontierDistance::Near;
        tower.gold_disabled = true;
        tower.troop_limits = [1, 1, 1, 1, 1];
        let mut ai = agent(&world);
        let event = Event::new(pos, EventKind::BorderChanged(BuildingType::Fortress));
        ai.handle_event(&mut world, event);
        let fortress = world.building(pos).unwrap();
        assert!(!fortress.gold_disabled);
        assert_eq!(fortress.troop_limits, [9; 5]);
    }

    #[test]
    fn test_tree_chopped_queues_one_job() {
        let mut world = colony();
        let mut ai = agent(&world);
        let pt = MapPoint::new(22, 24);
        ai.handle_event(&mut world, Event::new(pt, EventKind::TreeChopped));
        assert!(ai.nodes.get(pt).reachable);
        assert_eq!(ai.construction.build_job_count(), 1);
    }

    #[test]
    fn test_woodcutter_next_to_forester_survives() {
        let mut world = colony();
        let cutter = MapPoint::new(24, 24);
        world.add_building(ME, cutter, BuildingType::Woodcutter);
        world.add_building(ME, MapPoint::new(26, 24), BuildingType::Forester);
        let mut ai = agent(&world);
        ai.handle_event(
            &mut world,
            Event::new(cutter, EventKind::NoMoreResourcesReachable(BuildingType::Woodcutter)),
        );
        assert!(world.building(cutter).is_some());
    }

    #[test]
    fn test_exhausted_quarry_replaced() {
        let mut world = colony();
        let quarry = MapPoint::new(24, 24);
        world.add_building(ME, quarry, BuildingType::Quarry);
        let mut ai = agent(&world);
        let event = Event::new(quarry, EventKind::NoMoreResourcesReachable(BuildingType::Quarry));
        ai.handle_event(&mut world, event);
        assert!(world.building(quarry).is_none());
        assert!(ai.construction.build_jobs().any(|j| j.building() == Some(BuildingType::Quarry)));
    }
}
