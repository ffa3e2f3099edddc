//! Road connection and proximity queries used while constructing

use rand::Rng;
use tracing::{debug, trace};

use crate::core::types::{BuildingType, GoodType};
use crate::map::point::{Direction, MapPoint};
use crate::player::AiPlayer;
use crate::world::{Command, GameWorld, NodeObject};

/// Own flags this close are candidates for a new road
pub const CONNECT_RADIUS: u32 = 14;
/// Longest new road the coordinator asks for
pub const MAX_NEW_ROAD_LEN: u32 = 24;
/// Road distances beyond this count as disconnected
const MAX_ROAD_SEARCH: u32 = 500;
/// Search radius for shortcut roads
const SECONDARY_RADIUS: u32 = 10;
/// Enemy buildings this close call for a big military building
const ENEMY_NEARBY_RADIUS: u32 = 35;

impl AiPlayer {
    /// Own flags within `radius` of `pt`, closest first
    pub fn find_flags<W: GameWorld>(&self, world: &W, pt: MapPoint, radius: u32) -> Vec<MapPoint> {
        let size = world.map_size();
        let mut flags: Vec<(u32, MapPoint)> = world
            .flags(self.player)
            .into_iter()
            .map(|f| (size.distance(pt, f), f))
            .filter(|&(d, _)| d <= radius)
            .collect();
        flags.sort();
        flags.into_iter().map(|(_, f)| f).collect()
    }

    pub(crate) fn warehouse_flags<W: GameWorld>(&self, world: &W) -> Vec<MapPoint> {
        let size = world.map_size();
        world
            .warehouses(self.player)
            .iter()
            .map(|wh| size.neighbor(wh.pos, Direction::SouthEast))
            .collect()
    }

    /// Shortest road distance from `flag` to any warehouse flag
    pub(crate) fn road_distance_to_warehouse<W: GameWorld>(
        &self,
        world: &W,
        flag: MapPoint,
    ) -> Option<u32> {
        self.warehouse_flags(world)
            .into_iter()
            .filter_map(|wf| {
                if wf == flag {
                    Some(0)
                } else {
                    world.road_distance(self.player, flag, wf, MAX_ROAD_SEARCH)
                }
            })
            .min()
    }

    /// Whether goods could travel between `flag` and a warehouse
    pub fn is_connected_to_road_system<W: GameWorld>(&self, world: &W, flag: MapPoint) -> bool {
        self.road_distance_to_warehouse(world, flag).is_some()
    }

    /// Build the cheapest road from `flag` to a connected flag nearby
    ///
    /// Cost of a candidate: length of the new road plus half its road
    /// distance to the closest warehouse. Returns the route on success.
    pub fn connect_flag_to_road_system<W: GameWorld>(
        &mut self,
        world: &mut W,
        flag: MapPoint,
    ) -> Option<Vec<Direction>> {
        let mut best: Option<(u32, Vec<Direction>)> = None;
        for candidate in self.find_flags(world, flag, CONNECT_RADIUS) {
            if candidate == flag {
                continue;
            }
            let Some(to_warehouse) = self.road_distance_to_warehouse(world, candidate) else {
                continue;
            };
            let Some(route) =
                world.find_free_path_for_new_road(self.player, flag, candidate, MAX_NEW_ROAD_LEN)
            else {
                continue;
            };
            let cost = route.len() as u32 + to_warehouse / 2;
            if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                best = Some((cost, route));
            }
        }
        let (_, route) = best?;
        if !world.issue(self.player, Command::BuildRoad { start: flag, route: route.clone() }) {
            return None;
        }
        self.nodes.update_nodes_around(world, flag, route.len() as u32 + 1);
        trace!(player = self.player.0, %flag, len = route.len(), "road ordered");
        Some(route)
    }

    /// Add a shortcut when the way over existing roads is much longer
    /// than a new road would be
    pub(crate) fn build_secondary_road<W: GameWorld>(
        &mut self,
        world: &mut W,
        flag: MapPoint,
    ) -> bool {
        if !self.is_connected_to_road_system(world, flag) {
            return false;
        }
        for candidate in self.find_flags(world, flag, SECONDARY_RADIUS) {
            if candidate == flag || !self.is_connected_to_road_system(world, candidate) {
                continue;
            }
            let Some(route) =
                world.find_free_path_for_new_road(self.player, flag, candidate, SECONDARY_RADIUS)
            else {
                continue;
            };
            let limit = 3 * route.len() as u32 + 6;
            if world.road_distance(self.player, flag, candidate, limit).is_some() {
                continue;
            }
            if world.issue(self.player, Command::BuildRoad { start: flag, route: route.clone() }) {
                self.nodes.update_nodes_around(world, flag, route.len() as u32 + 1);
                debug!(player = self.player.0, %flag, %candidate, "shortcut road ordered");
                return true;
            }
        }
        false
    }

    /// Put flags on every second node of the road leaving `flag` in `dir`
    pub(crate) fn set_flags_along_road<W: GameWorld>(
        &mut self,
        world: &mut W,
        flag: MapPoint,
        dir: Direction,
    ) {
        let Some(route) = world.road_route(flag, dir) else {
            return;
        };
        let size = world.map_size();
        let mut cur = flag;
        for (i, &step) in route.iter().enumerate() {
            cur = size.neighbor(cur, step);
            let node = i + 1;
            if node % 2 == 0 && node + 1 < route.len() {
                world.issue(self.player, Command::SetFlag { pos: cur });
            }
        }
    }

    /// Positions of own buildings, sites and fresh orders of `kind`
    pub(crate) fn building_positions<W: GameWorld>(
        &self,
        world: &W,
        kind: BuildingType,
    ) -> Vec<MapPoint> {
        let player = self.player;
        let mut result: Vec<MapPoint> = if kind.is_military() {
            let found = world.military_buildings(player).into_iter();
            found.filter(|b| b.kind == kind).map(|b| b.pos).collect()
        } else if kind.is_warehouse() {
            let found = world.warehouses(player).into_iter();
            found.filter(|b| b.kind == kind).map(|b| b.pos).collect()
        } else {
            let found = world.buildings(player).into_iter();
            found.filter(|b| b.kind == kind).map(|b| b.pos).collect()
        };
        let sites = world.building_sites(player);
        result.extend(sites.into_iter().filter(|s| s.kind == kind).map(|s| s.pos));
        result.extend(self.construction.orders().iter().filter(|o| o.kind == kind).map(|o| o.pos));
        result.sort();
        result.dedup();
        result
    }

    /// A building, site or order of `kind` within `radius`
    pub(crate) fn is_building_nearby<W: GameWorld>(
        &self,
        world: &W,
        kind: BuildingType,
        pt: MapPoint,
        radius: u32,
    ) -> bool {
        let size = world.map_size();
        self.building_positions(world, kind)
            .into_iter()
            .any(|p| size.distance(p, pt) <= radius)
    }

    pub(crate) fn other_usual_building_in_radius<W: GameWorld>(
        &self,
        world: &W,
        pt: MapPoint,
        radius: u32,
        kind: BuildingType,
    ) -> bool {
        self.is_building_nearby(world, kind, pt, radius)
    }

    /// Any warehouse, warehouse site or ordered warehouse within `radius`
    pub(crate) fn other_store_in_radius<W: GameWorld>(
        &self,
        world: &W,
        pt: MapPoint,
        radius: u32,
    ) -> bool {
        [BuildingType::Headquarters, BuildingType::Storehouse, BuildingType::HarborBuilding]
            .iter()
            .any(|&kind| self.is_building_nearby(world, kind, pt, radius))
    }

    pub(crate) fn biggest_allowed_military<W: GameWorld>(&self, world: &W) -> Option<BuildingType> {
        BuildingType::MILITARY
            .iter()
            .rev()
            .copied()
            .find(|&kind| world.can_build(self.player, kind))
    }

    /// Military building type to put near `pt`
    ///
    /// Barracks by default and a guardhouse one time in three. Enemy
    /// buildings nearby call for the biggest type or a catapult; without
    /// an upgrade building the biggest type is used while stones last.
    pub(crate) fn choose_military_building<W: GameWorld>(
        &mut self,
        world: &W,
        pt: MapPoint,
    ) -> Option<BuildingType> {
        let biggest = self.biggest_allowed_military(world)?;
        let mut choice = if self.rng.gen_range(0..3) == 0 {
            BuildingType::Guardhouse
        } else {
            BuildingType::Barracks
        };
        let stones = world.inventory(self.player).good(GoodType::Stones);
        if self.upgrade_bld_pos.is_none()
            && stones > 6
            && self.building_positions(world, biggest).is_empty()
        {
            choice = biggest;
        }
        let size = world.map_size();
        let enemy_near = world
            .military_buildings_near(pt, ENEMY_NEARBY_RADIUS)
            .iter()
            .any(|b| {
                b.owner != self.player
                    && world.is_attackable(self.player, b.owner)
                    && size.distance(b.pos, pt) <= ENEMY_NEARBY_RADIUS
            });
        if enemy_near {
            choice = if world.can_build(self.player, BuildingType::Catapult)
                && stones > 6
                && self.rng.gen_range(0..3) == 0
            {
                BuildingType::Catapult
            } else {
                biggest
            };
        }
        if world.can_build(self.player, choice) {
            Some(choice)
        } else {
            Some(biggest)
        }
    }

    /// Flag of a warehouse, or of the building a flag belongs to
    pub(crate) fn is_warehouse_flag<W: GameWorld>(&self, world: &W, flag: MapPoint) -> bool {
        let building = world.map_size().neighbor(flag, Direction::NorthWest);
        matches!(
            world.object_at(building),
            NodeObject::Building { kind, .. } if kind.is_warehouse()
        )
    }
}
