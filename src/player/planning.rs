//! Periodic planning of new buildings around warehouses and military sites

use tracing::{debug, info};

use crate::core::types::{BuildingType, Gf, GoodType};
use crate::player::AiPlayer;
use crate::world::{Command, GameWorld};

/// Building types tried around warehouses, in this order
pub const PLANNED_BUILDINGS: [BuildingType; 24] = [
    BuildingType::HarborBuilding,
    BuildingType::Shipyard,
    BuildingType::Sawmill,
    BuildingType::Forester,
    BuildingType::Farm,
    BuildingType::Fishery,
    BuildingType::Woodcutter,
    BuildingType::Quarry,
    BuildingType::GoldMine,
    BuildingType::IronMine,
    BuildingType::CoalMine,
    BuildingType::GraniteMine,
    BuildingType::Hunter,
    BuildingType::Charburner,
    BuildingType::Ironsmelter,
    BuildingType::Mint,
    BuildingType::Armory,
    BuildingType::Metalworks,
    BuildingType::Brewery,
    BuildingType::Mill,
    BuildingType::PigFarm,
    BuildingType::Slaughterhouse,
    BuildingType::Bakery,
    BuildingType::DonkeyBreeder,
];

/// The leading entries of [`PLANNED_BUILDINGS`] gather raw resources and
/// are also tried around military buildings
pub const RESOURCE_GATHERERS: usize = 14;

/// Boards kept per warehouse before it stops accepting more
const BOARDS_PER_WAREHOUSE: u32 = 30;
/// Stones kept per warehouse before it stops accepting more
const STONES_PER_WAREHOUSE: u32 = 50;
/// Top-rank soldiers wanted in every frontier warehouse
const MAX_RANK_SOLDIERS_PER_WAREHOUSE: u32 = 5;
/// Expansion starts regardless of stock after this many frames
const EXPANSION_START_GF: Gf = 1500;
/// Boards in stock that allow expansion before then
const EXPANSION_BOARDS: u32 = 11;

impl AiPlayer {
    /// Queue jobs for every wanted building type
    ///
    /// Warehouses first get their stock settings reviewed. Then all wanted
    /// types are queued around every warehouse and the resource gatherers
    /// around every military building. A random warehouse and a random
    /// military building each get a military job, and the military building
    /// is torn down if it serves no purpose any more.
    pub fn plan_new_buildings<W: GameWorld>(&mut self, world: &mut W, gf: Gf) {
        self.planner.update(world, self.player, self.construction.orders());
        self.planner.update_buildings_wanted(world, self.player);

        let warehouses = world.warehouses(self.player);
        if !warehouses.is_empty() {
            if let Some(upgrade_wh) = self.upgrade_building_warehouse(world) {
                self.set_gathering_for_upgrade_warehouse(world, upgrade_wh.pos);
                if world.game_settings().max_military_rank > 0 {
                    self.distribute_max_rank_soldiers_by_blocking(
                        world,
                        MAX_RANK_SOLDIERS_PER_WAREHOUSE,
                        upgrade_wh.pos,
                    );
                }
            }
            self.distribute_goods_by_blocking(world, GoodType::Boards, BOARDS_PER_WAREHOUSE);
            self.distribute_goods_by_blocking(world, GoodType::Stones, STONES_PER_WAREHOUSE);

            let wh_pos = warehouses[self.random_index(warehouses.len())].pos;
            self.nodes
                .update_nodes_around(world, wh_pos, self.config.planning_refresh_radius);
            let mut queued = 0;
            for kind in PLANNED_BUILDINGS {
                if !self.planner.wanted(kind) {
                    continue;
                }
                for wh in &warehouses {
                    if self.add_build_job(kind, wh.pos, false) {
                        queued += 1;
                    }
                }
            }
            debug!(player = self.player.0, gf, queued, "planned around warehouses");
            if gf > EXPANSION_START_GF
                || world.inventory(self.player).good(GoodType::Boards) > EXPANSION_BOARDS
            {
                self.add_military_build_job(world, wh_pos);
            }
        }

        let military = world.military_buildings(self.player);
        if military.is_empty() {
            return;
        }
        let idx = self.random_index(military.len());
        let picked = &military[idx];
        self.nodes
            .update_nodes_around(world, picked.pos, self.config.planning_refresh_radius);
        for &kind in &PLANNED_BUILDINGS[..RESOURCE_GATHERERS] {
            if !self.planner.wanted(kind) {
                continue;
            }
            for bld in &military {
                self.add_build_job(kind, bld.pos, false);
            }
        }
        self.add_military_build_job(world, picked.pos);
        if picked.useless
            && picked.demolition_allowed
            && self.update_upgrade_building(world) != Some(idx)
        {
            info!(
                player = self.player.0,
                pos = %picked.pos,
                "demolishing useless military building"
            );
            world.issue(self.player, Command::DestroyBuilding { pos: picked.pos });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AiConfig;
    use crate::core::types::PlayerId;
    use crate::map::point::MapPoint;
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);

    fn colony() -> SimWorld {
        let mut world = SimWorld::new(48, 48);
        world.claim(ME, MapPoint::new(24, 24), 16);
        world.add_building(ME, MapPoint::new(24, 24), BuildingType::Headquarters);
        world
    }

    #[test]
    fn test_only_wanted_types_are_queued() {
        let mut world = colony();
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        ai.plan_new_buildings(&mut world, 200);
        let kinds: Vec<BuildingType> = ai
            .construction()
            .build_jobs()
            .filter_map(|job| job.building())
            .collect();
        assert!(!kinds.is_empty());
        for kind in &kinds {
            assert!(PLANNED_BUILDINGS.contains(kind), "{kind:?} not planned");
            assert!(ai.planner().wanted(*kind), "{kind:?} not wanted");
        }
        assert!(kinds.contains(&BuildingType::Woodcutter));
        assert!(!kinds.contains(&BuildingType::Mint));
    }

    #[test]
    fn test_useless_military_building_demolished() {
        let mut world = colony();
        let pos = MapPoint::new(30, 30);
        let bld = world.add_building(ME, pos, BuildingType::Barracks);
        bld.useless = true;
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        ai.plan_new_buildings(&mut world, 200);
        assert!(world
            .commands_of(ME)
            .iter()
            .any(|c| matches!(c, Command::DestroyBuilding { pos: p } if *p == pos)));
    }
}
