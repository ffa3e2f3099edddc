//! Site selection per building type
//!
//! Each building type maps to one [`PlacementRule`]. Resource-producing
//! buildings look for the best score on a resource map, the rest take the
//! first free node that fits, subject to type-specific spacing checks.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::types::{BuildingSize, BuildingType};
use crate::map::node::NodeResource;
use crate::map::point::MapPoint;
use crate::player::AiPlayer;
use crate::resources::AiResource;
use crate::world::{GameSettings, GameWorld, NodeObject};

/// Radius searched around the reference point
pub const SEARCH_RADIUS: u32 = 11;

/// How a building type picks its site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementRule {
    /// Best resource-map score of at least `minimum`
    Resource { res: AiResource, minimum: i32 },
    /// Spaced apart and only where trees can grow
    Forester,
    /// Needs huntable animals and no other hunter nearby
    Hunter,
    /// Stones with a minimum that grows with the number of quarries
    Quarry,
    /// Fish that a fisher can actually walk to
    Fishery,
    /// Mine without any resource check
    AnyMine,
    /// Lots of plant space, checked twice
    Farm,
    /// Spaced apart from other warehouses
    Storehouse,
    /// Harbor spot that opens up new land
    Harbor,
    /// Near a harbor spot, away from other shipyards
    Shipyard,
    Catapult,
    /// First free node that fits
    Simple,
}

impl PlacementRule {
    pub fn for_building(kind: BuildingType, settings: &GameSettings) -> Self {
        use BuildingType::*;
        match kind {
            Woodcutter => PlacementRule::Resource { res: AiResource::Wood, minimum: 20 },
            Forester => PlacementRule::Forester,
            Hunter => PlacementRule::Hunter,
            Quarry => PlacementRule::Quarry,
            Barracks | Guardhouse | Watchtower | Fortress => {
                PlacementRule::Resource { res: AiResource::Borderland, minimum: 1 }
            }
            GoldMine => PlacementRule::Resource { res: AiResource::Gold, minimum: 1 },
            CoalMine => PlacementRule::Resource { res: AiResource::Coal, minimum: 1 },
            IronMine => PlacementRule::Resource { res: AiResource::Ironore, minimum: 1 },
            GraniteMine if settings.inexhaustible_granite => PlacementRule::AnyMine,
            GraniteMine => PlacementRule::Resource { res: AiResource::Granite, minimum: 1 },
            Fishery => PlacementRule::Fishery,
            Storehouse => PlacementRule::Storehouse,
            HarborBuilding => PlacementRule::Harbor,
            Shipyard => PlacementRule::Shipyard,
            Farm => PlacementRule::Farm,
            Catapult => PlacementRule::Catapult,
            _ => PlacementRule::Simple,
        }
    }
}

impl AiPlayer {
    /// Site for `kind` within [`SEARCH_RADIUS`] of `around`
    pub fn find_position_for_building_around<W: GameWorld>(
        &mut self,
        world: &W,
        kind: BuildingType,
        around: MapPoint,
    ) -> Option<MapPoint> {
        let size = kind.size();
        match PlacementRule::for_building(kind, &world.game_settings()) {
            PlacementRule::Resource { res, minimum } => {
                self.find_best_position(world, res, around, size, minimum)
            }
            PlacementRule::Forester => {
                if self.other_usual_building_in_radius(world, around, 12, BuildingType::Forester)
                    || self.nodes.density(world, around, NodeResource::Plantspace, 7) <= 15
                {
                    return None;
                }
                self.find_best_position(world, AiResource::Wood, around, size, 0)
            }
            PlacementRule::Hunter => {
                let hunters = self.planner.count(BuildingType::Hunter);
                let needed = 2u32 << hunters.min(16);
                if self.huntables_in_range(world, around, needed) {
                    self.simple_find_position(world, around, size, SEARCH_RADIUS)
                } else {
                    None
                }
            }
            PlacementRule::Quarry => {
                let quarries = self.planner.count(BuildingType::Quarry) as i32;
                let minimum = (1 + quarries * 10).min(40);
                let pos =
                    self.find_best_position(world, AiResource::Stones, around, size, minimum)?;
                if self.valid_stone_in_range(world, pos) {
                    Some(pos)
                } else {
                    self.res_maps.get_mut(AiResource::Stones).avoid_position(pos);
                    None
                }
            }
            PlacementRule::Fishery => {
                let pos = self.find_best_position(world, AiResource::Fish, around, size, 1)?;
                if self.valid_fish_in_range(world, pos) {
                    Some(pos)
                } else {
                    self.res_maps.get_mut(AiResource::Fish).avoid_position(pos);
                    None
                }
            }
            PlacementRule::AnyMine => self.simple_find_position(world, around, size, SEARCH_RADIUS),
            PlacementRule::Farm => {
                self.find_best_position(world, AiResource::Plantspace, around, size, 85)?;
                self.find_best_position(world, AiResource::Plantspace, around, size, 85)
            }
            PlacementRule::Storehouse => {
                if self.other_store_in_radius(world, around, 15) {
                    None
                } else {
                    self.simple_find_position(world, around, size, SEARCH_RADIUS)
                }
            }
            PlacementRule::Harbor => {
                let pos = self.simple_find_position(world, around, size, SEARCH_RADIUS)?;
                self.harbor_pos_relevant(world, pos, false).then_some(pos)
            }
            PlacementRule::Shipyard => {
                let pos = self.simple_find_position(world, around, size, SEARCH_RADIUS)?;
                (!self.is_invalid_shipyard_position(world, pos)).then_some(pos)
            }
            PlacementRule::Catapult => {
                let pos = self.simple_find_position(world, around, size, SEARCH_RADIUS)?;
                (!self.is_building_nearby(world, BuildingType::Catapult, pos, 7)).then_some(pos)
            }
            PlacementRule::Simple => self.simple_find_position(world, around, size, SEARCH_RADIUS),
        }
    }

    /// Try around `around` first, then around every warehouse
    pub(crate) fn find_position_globally<W: GameWorld>(
        &mut self,
        world: &W,
        kind: BuildingType,
        around: MapPoint,
    ) -> Option<MapPoint> {
        if let Some(pos) = self.find_position_for_building_around(world, kind, around) {
            return Some(pos);
        }
        for wh in world.warehouses(self.player) {
            if wh.pos == around {
                continue;
            }
            if let Some(pos) = self.find_position_for_building_around(world, kind, wh.pos) {
                return Some(pos);
            }
        }
        None
    }

    pub(crate) fn find_best_position<W: GameWorld>(
        &mut self,
        world: &W,
        res: AiResource,
        around: MapPoint,
        size: BuildingSize,
        minimum: i32,
    ) -> Option<MapPoint> {
        self.res_maps.find_best_position(
            world,
            self.player,
            &self.nodes,
            res,
            around,
            size,
            SEARCH_RADIUS,
            minimum,
        )
    }

    /// First reachable, own, unreserved node whose live quality fits `size`
    ///
    /// Nodes next to an empty harbor spot are kept free for the harbor.
    pub fn simple_find_position<W: GameWorld>(
        &mut self,
        world: &W,
        pt: MapPoint,
        size: BuildingSize,
        radius: u32,
    ) -> Option<MapPoint> {
        for cur in world.map_size().points_in_radius(pt, radius) {
            let node = *self.nodes.get(cur);
            if !node.reachable || node.farmed || world.owner(cur) != Some(self.player) {
                continue;
            }
            if size != BuildingSize::Harbor && self.is_harbor_pos_close(world, cur, 2, true) {
                continue;
            }
            let live = world.building_quality(self.player, cur);
            if live != node.bq {
                trace!(
                    player = self.player.0,
                    pos = %cur,
                    cached = ?node.bq,
                    ?live,
                    "stale building quality"
                );
                self.nodes.get_mut(cur).bq = live;
            }
            if live.permits(size) {
                return Some(cur);
            }
        }
        None
    }

    /// A harbor spot within `radius`, optionally only one still free
    pub(crate) fn is_harbor_pos_close<W: GameWorld>(
        &self,
        world: &W,
        pt: MapPoint,
        radius: u32,
        only_empty: bool,
    ) -> bool {
        let size = world.map_size();
        world.harbor_points().iter().any(|h| {
            size.distance(h.pos, pt) <= radius
                && (!only_empty || world.is_harbor_point_free(h.pos, self.player))
        })
    }

    pub(crate) fn is_invalid_shipyard_position<W: GameWorld>(
        &self,
        world: &W,
        pt: MapPoint,
    ) -> bool {
        self.is_building_nearby(world, BuildingType::Shipyard, pt, 19)
            || !self.is_harbor_pos_close(world, pt, 7, false)
    }

    /// At least `min` animals a hunter can walk to, and no hunter nearby
    pub(crate) fn huntables_in_range<W: GameWorld>(
        &self,
        world: &W,
        pt: MapPoint,
        min: u32,
    ) -> bool {
        if self.is_building_nearby(world, BuildingType::Hunter, pt, 14) {
            return false;
        }
        let reachable = world
            .huntable_animals(pt, 19)
            .into_iter()
            .filter(|&animal| world.find_human_path(pt, animal, 25).is_some())
            .count() as u32;
        reachable >= min
    }

    /// Granite a stonemason can walk to within 20 steps
    pub(crate) fn valid_stone_in_range<W: GameWorld>(&self, world: &W, pt: MapPoint) -> bool {
        world
            .map_size()
            .points_in_radius(pt, 8)
            .into_iter()
            .any(|p| {
                world.object_at(p) == NodeObject::Granite
                    && world.find_human_path(pt, p, 20).is_some()
            })
    }

    /// Fish next to a coast node a fisher can walk to within 10 steps
    pub(crate) fn valid_fish_in_range<W: GameWorld>(&self, world: &W, pt: MapPoint) -> bool {
        let size = world.map_size();
        size.points_in_radius(pt, 5).into_iter().any(|p| {
            world.has_fish(p)
                && size
                    .neighbors(p)
                    .iter()
                    .any(|&nb| world.find_human_path(pt, nb, 10).is_some())
        })
    }
}
