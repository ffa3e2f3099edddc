//! Building demand
//!
//! Counts what the player owns or has ordered and derives, per building
//! type, how many instances the economy can use. Everything is recomputed
//! from the current world snapshot.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::construction::ConstructionOrder;
use crate::core::types::{BuildingType, GoodType, PlayerId};
use crate::world::GameWorld;

/// Upper bound on military building sites at a time
const MAX_MILITARY_SITES: u32 = 5;

/// Counts and demand of one player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingPlanner {
    buildings: AHashMap<BuildingType, u32>,
    sites: AHashMap<BuildingType, u32>,
    wanted: AHashMap<BuildingType, u32>,
}

impl BuildingPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recount finished buildings and sites
    ///
    /// Orders from the current batch that the world does not list yet
    /// count as sites.
    pub fn update<W: GameWorld>(
        &mut self,
        world: &W,
        player: PlayerId,
        orders: &[ConstructionOrder],
    ) {
        self.buildings.clear();
        self.sites.clear();
        for b in world.buildings(player) {
            *self.buildings.entry(b.kind).or_insert(0) += 1;
        }
        for m in world.military_buildings(player) {
            *self.buildings.entry(m.kind).or_insert(0) += 1;
        }
        for w in world.warehouses(player) {
            *self.buildings.entry(w.kind).or_insert(0) += 1;
        }
        let sites = world.building_sites(player);
        for s in &sites {
            *self.sites.entry(s.kind).or_insert(0) += 1;
        }
        for order in orders {
            if !sites.iter().any(|s| s.pos == order.pos) {
                *self.sites.entry(order.kind).or_insert(0) += 1;
            }
        }
    }

    pub fn buildings(&self, kind: BuildingType) -> u32 {
        self.buildings.get(&kind).copied().unwrap_or(0)
    }

    pub fn sites(&self, kind: BuildingType) -> u32 {
        self.sites.get(&kind).copied().unwrap_or(0)
    }

    /// Finished buildings plus sites
    pub fn count(&self, kind: BuildingType) -> u32 {
        self.buildings(kind) + self.sites(kind)
    }

    pub fn military_buildings(&self) -> u32 {
        BuildingType::MILITARY.iter().map(|&k| self.buildings(k)).sum()
    }

    pub fn military_sites(&self) -> u32 {
        BuildingType::MILITARY.iter().map(|&k| self.sites(k)).sum()
    }

    pub fn wanted_count(&self, kind: BuildingType) -> u32 {
        self.wanted.get(&kind).copied().unwrap_or(0)
    }

    /// Whether one more building of `kind` would be useful now
    pub fn wanted(&self, kind: BuildingType) -> bool {
        if kind.is_military() {
            return self.want_more_military();
        }
        self.count(kind) < self.wanted_count(kind)
    }

    /// Military sites in flight: `min(5, 2 + military / 4)`
    pub fn want_more_military(&self) -> bool {
        let limit = (2 + self.military_buildings() / 4).min(MAX_MILITARY_SITES);
        self.military_sites() < limit
    }

    /// Recompute demand from counts, stock and game settings
    ///
    /// Wood: `woodcutters = 2 + 2 * foresters` (at most 12),
    /// `foresters = 1 + military / 6` (at most 6),
    /// `sawmills = 1 + woodcutters / 4`.
    /// Stone: `quarries = 2 + military / 8` (at most 6), granite mines
    /// once stones run short in a grown realm.
    /// Inexhaustible mines and fish waters lower the mine and fishery
    /// counts, and inexhaustible granite mines are wanted regardless of
    /// the stone stock.
    /// Food follows the number of mines, metal follows the mines and weapons
    /// follow the smelters. Farms match their consumers one to one.
    pub fn update_buildings_wanted<W: GameWorld>(&mut self, world: &W, player: PlayerId) {
        let inventory = world.inventory(player);
        let settings = world.game_settings();
        let military = self.military_buildings();
        let n = |kind: BuildingType| self.count(kind);
        let mut wanted: AHashMap<BuildingType, u32> = AHashMap::new();

        let foresters = (1 + military / 6).min(6);
        let woodcutters = (2 + 2 * n(BuildingType::Forester)).min(12);
        wanted.insert(BuildingType::Forester, foresters);
        wanted.insert(BuildingType::Woodcutter, woodcutters);
        wanted.insert(BuildingType::Sawmill, 1 + n(BuildingType::Woodcutter) / 4);

        wanted.insert(BuildingType::Quarry, (2 + military / 8).min(6));
        let stones = inventory.good(GoodType::Stones);
        let granite = if military < 5 {
            0
        } else if settings.inexhaustible_mines || settings.inexhaustible_granite {
            (1 + military / 30).min(2)
        } else if stones < 100 || n(BuildingType::Quarry) == 0 {
            (1 + military / 15).min(3)
        } else {
            0
        };
        wanted.insert(BuildingType::GraniteMine, granite);

        // metal, mines that never run dry need no replacements
        let iron_mines = match (military >= 3, settings.inexhaustible_mines) {
            (false, _) => 0,
            (true, false) => (1 + military / 10).min(4),
            (true, true) => (1 + military / 20).min(2),
        };
        let gold_allowed = military >= 5 && settings.max_military_rank > 0;
        let gold_mines = match (gold_allowed, settings.inexhaustible_mines) {
            (false, _) => 0,
            (true, false) => (1 + military / 20).min(2),
            (true, true) => 1,
        };
        wanted.insert(BuildingType::IronMine, iron_mines);
        wanted.insert(BuildingType::GoldMine, gold_mines);
        wanted.insert(
            BuildingType::CoalMine,
            n(BuildingType::IronMine) + n(BuildingType::GoldMine),
        );
        let smelters = n(BuildingType::IronMine);
        wanted.insert(BuildingType::Ironsmelter, smelters);
        wanted.insert(BuildingType::Armory, n(BuildingType::Ironsmelter));
        wanted.insert(BuildingType::Metalworks, u32::from(n(BuildingType::Ironsmelter) > 0));
        wanted.insert(BuildingType::Mint, n(BuildingType::GoldMine));
        let charburners = if n(BuildingType::CoalMine) == 0
            && n(BuildingType::Ironsmelter) > 0
            && n(BuildingType::Woodcutter) >= 6
        {
            1
        } else {
            0
        };
        wanted.insert(BuildingType::Charburner, charburners);
        wanted.insert(BuildingType::Brewery, u32::from(n(BuildingType::Armory) > 0));

        // food
        let mines = [
            BuildingType::GraniteMine,
            BuildingType::CoalMine,
            BuildingType::IronMine,
            BuildingType::GoldMine,
        ]
        .iter()
        .map(|&k| n(k))
        .sum::<u32>();
        let fisheries = if settings.inexhaustible_fish {
            (1 + mines / 3).min(4)
        } else {
            (1 + mines / 2).min(8)
        };
        wanted.insert(BuildingType::Fishery, fisheries);
        wanted.insert(BuildingType::Hunter, (1 + military / 12).min(3));
        let mills = (mines + 1) / 2;
        wanted.insert(BuildingType::Mill, mills);
        wanted.insert(BuildingType::Bakery, n(BuildingType::Mill));
        let pig_farms = mines / 3;
        wanted.insert(BuildingType::PigFarm, pig_farms);
        wanted.insert(BuildingType::Slaughterhouse, n(BuildingType::PigFarm).div_ceil(2));
        let donkeys = u32::from(military >= 15);
        wanted.insert(BuildingType::DonkeyBreeder, donkeys);
        let farm_users = n(BuildingType::Mill)
            + n(BuildingType::PigFarm)
            + n(BuildingType::Brewery)
            + n(BuildingType::DonkeyBreeder);
        wanted.insert(BuildingType::Farm, farm_users);
        wanted.insert(
            BuildingType::Well,
            n(BuildingType::Bakery) + n(BuildingType::PigFarm) + n(BuildingType::Brewery),
        );

        // logistics
        wanted.insert(BuildingType::Storehouse, military / 8);
        let harbors = if world.harbor_points().is_empty() {
            0
        } else {
            n(BuildingType::HarborBuilding) + 1
        };
        wanted.insert(BuildingType::HarborBuilding, harbors);
        let has_harbor = self.buildings(BuildingType::HarborBuilding) > 0;
        wanted.insert(BuildingType::Shipyard, u32::from(has_harbor));
        wanted.insert(BuildingType::Catapult, 0);

        self.wanted = wanted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::point::MapPoint;
    use crate::world::sim::SimWorld;
    use crate::world::GameSettings;

    const P0: PlayerId = PlayerId(0);

    #[test]
    fn test_counts_include_sites_and_orders() {
        let mut world = SimWorld::new(32, 32);
        world.claim(P0, MapPoint::new(10, 10), 9);
        world.add_building(P0, MapPoint::new(10, 10), BuildingType::Woodcutter);
        world.add_site(P0, MapPoint::new(14, 10), BuildingType::Woodcutter);
        let orders = [
            ConstructionOrder { pos: MapPoint::new(14, 10), kind: BuildingType::Woodcutter },
            ConstructionOrder { pos: MapPoint::new(6, 6), kind: BuildingType::Quarry },
        ];
        let mut planner = BuildingPlanner::new();
        planner.update(&world, P0, &orders);
        assert_eq!(planner.buildings(BuildingType::Woodcutter), 1);
        assert_eq!(planner.sites(BuildingType::Woodcutter), 1);
        assert_eq!(planner.count(BuildingType::Quarry), 1);
    }

    #[test]
    fn test_fresh_colony_wants_basic_economy() {
        let mut world = SimWorld::new(32, 32);
        world.claim(P0, MapPoint::new(10, 10), 9);
        world.add_building(P0, MapPoint::new(10, 10), BuildingType::Headquarters);
        let mut planner = BuildingPlanner::new();
        planner.update(&world, P0, &[]);
        planner.update_buildings_wanted(&world, P0);
        assert!(planner.wanted(BuildingType::Woodcutter));
        assert!(planner.wanted(BuildingType::Forester));
        assert!(planner.wanted(BuildingType::Quarry));
        assert!(planner.wanted(BuildingType::Sawmill));
        assert!(!planner.wanted(BuildingType::GoldMine));
        assert!(!planner.wanted(BuildingType::HarborBuilding));
        assert!(!planner.wanted(BuildingType::Storehouse));
        assert!(planner.wanted(BuildingType::Barracks));
    }

    #[test]
    fn test_demand_satisfied_by_existing_buildings() {
        let mut world = SimWorld::new(32, 32);
        world.claim(P0, MapPoint::new(10, 10), 9);
        world.add_building(P0, MapPoint::new(6, 6), BuildingType::Forester);
        let mut planner = BuildingPlanner::new();
        planner.update(&world, P0, &[]);
        planner.update_buildings_wanted(&world, P0);
        assert_eq!(planner.wanted_count(BuildingType::Forester), 1);
        assert!(!planner.wanted(BuildingType::Forester));
        assert_eq!(planner.wanted_count(BuildingType::Woodcutter), 4);
    }

    #[test]
    fn test_military_sites_capped() {
        let mut world = SimWorld::new(40, 40);
        world.claim(P0, MapPoint::new(20, 20), 15);
        for i in 0..2u16 {
            world.add_site(P0, MapPoint::new(8 + i * 4, 20), BuildingType::Barracks);
        }
        let mut planner = BuildingPlanner::new();
        planner.update(&world, P0, &[]);
        assert_eq!(planner.military_sites(), 2);
        assert!(!planner.want_more_military());
    }

    fn grown_realm(settings: GameSettings) -> SimWorld {
        let mut world = SimWorld::new(64, 64);
        world.claim(P0, MapPoint::new(32, 32), 30);
        for i in 0..20u16 {
            let pos = MapPoint::new(4 + 3 * (i % 10), 10 + 4 * (i / 10));
            world.add_building(P0, pos, BuildingType::Barracks);
        }
        for i in 0..4u16 {
            world.add_building(P0, MapPoint::new(4 + 4 * i, 40), BuildingType::IronMine);
        }
        world.set_game_settings(settings);
        world
    }

    fn wanted_in(world: &SimWorld) -> BuildingPlanner {
        let mut planner = BuildingPlanner::new();
        planner.update(world, P0, &[]);
        planner.update_buildings_wanted(world, P0);
        planner
    }

    #[test]
    fn test_inexhaustible_resources_lower_demand() {
        let base = GameSettings { max_military_rank: 4, ..GameSettings::default() };
        let finite = wanted_in(&grown_realm(base));
        assert_eq!(finite.wanted_count(BuildingType::IronMine), 3);
        assert_eq!(finite.wanted_count(BuildingType::GoldMine), 2);
        assert_eq!(finite.wanted_count(BuildingType::GraniteMine), 2);
        assert_eq!(finite.wanted_count(BuildingType::Fishery), 3);

        let endless = GameSettings {
            inexhaustible_mines: true,
            inexhaustible_fish: true,
            ..base
        };
        let endless = wanted_in(&grown_realm(endless));
        assert_eq!(endless.wanted_count(BuildingType::IronMine), 2);
        assert_eq!(endless.wanted_count(BuildingType::GoldMine), 1);
        assert_eq!(endless.wanted_count(BuildingType::GraniteMine), 1);
        assert_eq!(endless.wanted_count(BuildingType::Fishery), 2);
    }

    #[test]
    fn test_inexhaustible_granite_wanted_despite_stock() {
        let mut world = grown_realm(GameSettings::default());
        world.add_building(P0, MapPoint::new(30, 50), BuildingType::Quarry);
        let hq = world.add_building(P0, MapPoint::new(30, 20), BuildingType::Headquarters);
        hq.inventory.add_good(GoodType::Stones, 200);
        assert_eq!(wanted_in(&world).wanted_count(BuildingType::GraniteMine), 0);

        world.set_game_settings(GameSettings {
            inexhaustible_granite: true,
            ..GameSettings::default()
        });
        assert_eq!(wanted_in(&world).wanted_count(BuildingType::GraniteMine), 1);
    }
}
