//! Sea attacks

use ahash::AHashSet;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::core::types::{BuildingType, SeaId};
use crate::map::point::MapPoint;
use crate::player::AiPlayer;
use crate::world::{Command, GameWorld};

/// Harbor spots searched for nearby targets per round
const MAX_SEARCH_SPOTS: usize = 15;
/// Radius around a harbor spot searched for targets
const HARBOR_TARGET_RADIUS: u32 = 12;

impl AiPlayer {
    /// Land soldiers next to one enemy building reachable by ship
    ///
    /// Needs a ship and a harbor. Undefended harbors and headquarters go
    /// first and get a single soldier; otherwise a random defended target
    /// gets everyone available. Returns whether an attack was ordered.
    pub fn try_sea_attack<W: GameWorld>(&mut self, world: &mut W) -> bool {
        let ships = world.ships(self.player);
        if ships.is_empty() || !world.warehouses(self.player).iter().any(|wh| wh.is_harbor()) {
            return false;
        }
        let mut seas: Vec<SeaId> = ships
            .iter()
            .map(|ship| ship.sea)
            .filter(|&sea| world.sea_attackers_at_sea(self.player, sea) > 0)
            .collect();
        seas.sort_unstable();
        seas.dedup();
        if seas.is_empty() {
            return false;
        }

        let mut undefended: Vec<MapPoint> = Vec::new();
        let mut potential: Vec<MapPoint> = Vec::new();
        let mut search: Vec<MapPoint> = Vec::new();
        for spot in world.harbor_points() {
            match world.military_building_at(spot.pos) {
                Some(harbor)
                    if harbor.kind == BuildingType::HarborBuilding
                        && world.is_attackable(self.player, harbor.owner) =>
                {
                    if !world.is_visible(self.player, spot.pos)
                        || world.filtered_seas_for_attack(spot.pos, &seas, self.player).is_empty()
                    {
                        continue;
                    }
                    if harbor.defenders == 0 {
                        undefended.push(spot.pos);
                    } else {
                        potential.push(spot.pos);
                    }
                }
                _ => search.push(spot.pos),
            }
        }

        undefended.shuffle(&mut self.rng);
        if self.sea_attack_first_undefended(world, &undefended) {
            return true;
        }

        // Look for other buildings around a sample of the free or friendly spots
        let mut known: AHashSet<MapPoint> = undefended.iter().chain(&potential).copied().collect();
        let mut undefended: Vec<MapPoint> = Vec::new();
        let skip = if search.len() > MAX_SEARCH_SPOTS {
            self.rng.gen_range(0..search.len())
        } else {
            0
        };
        let spots = search
            .iter()
            .cycle()
            .skip(skip)
            .take(search.len().min(MAX_SEARCH_SPOTS));
        for &spot in spots {
            for target in world.military_buildings_near(spot, HARBOR_TARGET_RADIUS) {
                if known.contains(&target.pos)
                    || !world.is_attackable(self.player, target.owner)
                    || !world.is_visible(self.player, target.pos)
                    || (target.is_military_building() && target.new_built)
                {
                    continue;
                }
                known.insert(target.pos);
                let reachable =
                    !world.filtered_seas_for_attack(target.pos, &seas, self.player).is_empty();
                if !target.is_military_building() && target.defenders == 0 && reachable {
                    undefended.push(target.pos);
                } else {
                    potential.push(target.pos);
                }
            }
        }

        undefended.shuffle(&mut self.rng);
        if self.sea_attack_first_undefended(world, &undefended) {
            return true;
        }

        potential.shuffle(&mut self.rng);
        for target in potential {
            if world.filtered_seas_for_attack(target, &seas, self.player).is_empty() {
                continue;
            }
            let force = world.soldiers_for_sea_attack(self.player, target);
            if force.soldiers == 0 {
                continue;
            }
            info!(player = self.player.0, %target, soldiers = force.soldiers, "sea attack ordered");
            world.issue(
                self.player,
                Command::SeaAttack { target, soldiers: force.soldiers, strong_first: true },
            );
            return true;
        }
        false
    }

    fn sea_attack_first_undefended<W: GameWorld>(
        &self,
        world: &mut W,
        targets: &[MapPoint],
    ) -> bool {
        let Some(&target) = targets
            .iter()
            .find(|&&t| world.soldiers_for_sea_attack(self.player, t).soldiers > 0)
        else {
            return false;
        };
        info!(player = self.player.0, %target, "sea attack on undefended target");
        world.issue(self.player, Command::SeaAttack { target, soldiers: 1, strong_first: true });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AiConfig;
    use crate::core::types::{PlayerId, ShipId};
    use crate::world::ShipInfo;
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);
    const ENEMY: PlayerId = PlayerId(1);

    fn island_world() -> SimWorld {
        let mut world = SimWorld::new(48, 32);
        world.claim(ME, MapPoint::new(8, 16), 6);
        world.claim(ENEMY, MapPoint::new(38, 16), 6);
        world.add_harbor_point(MapPoint::new(10, 16), vec![1]);
        world.add_harbor_point(MapPoint::new(36, 16), vec![1]);
        world.add_building(ME, MapPoint::new(10, 16), BuildingType::HarborBuilding);
        world.add_ship(
            ME,
            ShipInfo {
                id: ShipId(1),
                pos: MapPoint::new(20, 16),
                sea: 1,
                waiting_for_expedition: false,
                can_found_colony: false,
            },
        );
        world.set_sea_attackers(ME, 1, 3);
        world
    }

    fn sea_attacks(world: &SimWorld) -> Vec<Command> {
        world
            .commands_of(ME)
            .into_iter()
            .filter(|c| matches!(c, Command::SeaAttack { .. }))
            .cloned()
            .collect()
    }

    #[test]
    fn test_undefended_harbor_gets_one_soldier() {
        let mut world = island_world();
        world.add_building(ENEMY, MapPoint::new(36, 16), BuildingType::HarborBuilding);
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(ai.try_sea_attack(&mut world));
        assert_eq!(
            sea_attacks(&world),
            vec![Command::SeaAttack {
                target: MapPoint::new(36, 16),
                soldiers: 1,
                strong_first: true,
            }]
        );
    }

    #[test]
    fn test_defended_building_gets_all_attackers() {
        let mut world = island_world();
        let barracks = world.add_building(ENEMY, MapPoint::new(38, 14), BuildingType::Barracks);
        barracks.troops = 2;
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(ai.try_sea_attack(&mut world));
        assert_eq!(
            sea_attacks(&world),
            vec![Command::SeaAttack {
                target: MapPoint::new(38, 14),
                soldiers: 3,
                strong_first: true,
            }]
        );
    }

    #[test]
    fn test_no_ships_no_attack() {
        let mut world = SimWorld::new(48, 32);
        world.claim(ME, MapPoint::new(8, 16), 6);
        world.add_harbor_point(MapPoint::new(36, 16), vec![1]);
        world.add_building(ME, MapPoint::new(10, 16), BuildingType::HarborBuilding);
        world.add_building(ENEMY, MapPoint::new(36, 16), BuildingType::HarborBuilding);
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(!ai.try_sea_attack(&mut world));
        assert!(sea_attacks(&world).is_empty());
    }

    #[test]
    fn test_idle_sea_without_attackers() {
        let mut world = island_world();
        world.set_sea_attackers(ME, 1, 0);
        world.add_building(ENEMY, MapPoint::new(36, 16), BuildingType::HarborBuilding);
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(!ai.try_sea_attack(&mut world));
    }
}
