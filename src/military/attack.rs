//! Land attacks

use ahash::AHashSet;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::core::config::AiLevel;
use crate::core::types::FrontierDistance;
use crate::map::point::MapPoint;
use crate::military::AttackTarget;
use crate::player::AiPlayer;
use crate::world::{AttackForce, Command, GameWorld};

/// Own buildings looked at per round before sampling starts
const SCAN_LIMIT: usize = 40;

impl AiPlayer {
    /// Attack one enemy building near the border, if any can be taken
    ///
    /// Headquarters and harbors without defenders come first, the other
    /// candidates in random order. Returns whether an attack was ordered.
    pub fn try_to_attack<W: GameWorld>(&mut self, world: &mut W) -> bool {
        let own = world.military_buildings(self.player);
        if own.is_empty() {
            return false;
        }
        let size = world.map_size();
        let radius = self.config.attack_radius;
        let num = own.len();

        let mut seen: AHashSet<MapPoint> = AHashSet::new();
        let mut undefended: Vec<AttackTarget> = Vec::new();
        let mut potential: Vec<AttackTarget> = Vec::new();
        for bld in &own {
            // Big realms look at roughly SCAN_LIMIT buildings per round
            if self.rng.gen_range(0..num) > SCAN_LIMIT {
                continue;
            }
            if bld.frontier == FrontierDistance::Far {
                continue;
            }
            for target in world.military_buildings_near(bld.pos, radius) {
                if seen.contains(&target.pos) {
                    continue;
                }
                if target.is_military_building() && target.new_built {
                    continue;
                }
                if size.distance(bld.pos, target.pos) >= radius
                    || !world.is_attackable(self.player, target.owner)
                    || !world.is_visible(self.player, target.pos)
                {
                    continue;
                }
                seen.insert(target.pos);
                let candidate = AttackTarget {
                    pos: target.pos,
                    defenders: target.defenders,
                    strength: target.strength,
                    military: target.is_military_building(),
                };
                if !candidate.military && candidate.defenders == 0 {
                    undefended.push(candidate);
                } else {
                    potential.push(candidate);
                }
            }
        }
        undefended.shuffle(&mut self.rng);
        potential.shuffle(&mut self.rng);

        for target in undefended.into_iter().chain(potential) {
            let force = self.land_attack_force(world, target.pos);
            if force.soldiers == 0 {
                continue;
            }
            if self.config.level == AiLevel::Hard
                && target.military
                && force.strength <= target.strength
                && target.defenders > 0
            {
                debug!(player = self.player.0, pos = %target.pos, "target too strong");
                continue;
            }
            info!(
                player = self.player.0,
                target = %target.pos,
                soldiers = force.soldiers,
                "attack ordered"
            );
            world.issue(
                self.player,
                Command::Attack {
                    target: target.pos,
                    soldiers: force.soldiers,
                    strong_first: true,
                },
            );
            return true;
        }
        false
    }

    /// Soldiers all own buildings near `target` could send
    fn land_attack_force<W: GameWorld>(&self, world: &W, target: MapPoint) -> AttackForce {
        let mut total = AttackForce::default();
        for bld in world.military_buildings_near(target, self.config.attack_radius) {
            if bld.owner != self.player || !bld.is_military_building() || bld.under_attack {
                continue;
            }
            let force = world.soldiers_for_attack(bld.pos, target);
            total.soldiers += force.soldiers;
            total.strength += force.strength;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AiConfig;
    use crate::core::types::{BuildingType, PlayerId};
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);
    const ENEMY: PlayerId = PlayerId(1);

    fn frontier_world() -> SimWorld {
        let mut world = SimWorld::new(48, 32);
        world.claim(ME, MapPoint::new(8, 16), 8);
        world.claim(ENEMY, MapPoint::new(30, 16), 8);
        world.add_building(ME, MapPoint::new(6, 16), BuildingType::Headquarters);
        let tower = world.add_building(ME, MapPoint::new(14, 16), BuildingType::Watchtower);
        tower.frontier = FrontierDistance::Near;
        tower.troops = 5;
        tower.strength = 10;
        world
    }

    fn attacks(world: &SimWorld) -> usize {
        world.commands_of(ME).iter().filter(|c| c.is_attack()).count()
    }

    #[test]
    fn test_undefended_headquarters_attacked() {
        let mut world = frontier_world();
        world.add_building(ENEMY, MapPoint::new(26, 16), BuildingType::Headquarters);
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(ai.try_to_attack(&mut world));
        assert_eq!(attacks(&world), 1);
        assert!(matches!(
            world.commands_of(ME).last(),
            Some(Command::Attack { target, soldiers: 4, .. }) if *target == MapPoint::new(26, 16)
        ));
    }

    #[test]
    fn test_targets_beyond_radius_ignored() {
        let mut world = frontier_world();
        world.add_building(ENEMY, MapPoint::new(40, 16), BuildingType::Headquarters);
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(!ai.try_to_attack(&mut world));
        assert_eq!(attacks(&world), 0);
    }

    #[test]
    fn test_far_buildings_do_not_look_for_targets() {
        let mut world = frontier_world();
        world.add_building(ENEMY, MapPoint::new(26, 16), BuildingType::Headquarters);
        if let Some(tower) = world.building_mut(MapPoint::new(14, 16)) {
            tower.frontier = FrontierDistance::Far;
        }
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(!ai.try_to_attack(&mut world));
    }

    #[test]
    fn test_invisible_targets_ignored() {
        let mut world = frontier_world();
        world.add_building(ENEMY, MapPoint::new(26, 16), BuildingType::Headquarters);
        world.set_visible(ME, MapPoint::new(26, 16), false);
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(!ai.try_to_attack(&mut world));
    }

    #[test]
    fn test_hard_level_skips_stronger_defenders() {
        let mut world = frontier_world();
        let enemy = world.add_building(ENEMY, MapPoint::new(26, 16), BuildingType::Fortress);
        enemy.troops = 6;
        enemy.strength = 40;
        let config = AiConfig::new(AiLevel::Hard);
        let mut ai = AiPlayer::new(&world, &config, ME).unwrap();
        assert!(!ai.try_to_attack(&mut world));

        let mut medium = AiPlayer::new(&world, &AiConfig::new(AiLevel::Medium), ME).unwrap();
        assert!(medium.try_to_attack(&mut world));
        assert_eq!(attacks(&world), 1);
    }

    #[test]
    fn test_one_attack_per_round() {
        let mut world = frontier_world();
        for y in [12u16, 16, 20] {
            let b = world.add_building(ENEMY, MapPoint::new(26, y), BuildingType::Barracks);
            b.troops = 1;
        }
        let mut ai = AiPlayer::new(&world, &AiConfig::default(), ME).unwrap();
        assert!(ai.try_to_attack(&mut world));
        assert_eq!(attacks(&world), 1);
    }

    #[test]
    fn test_undefended_targets_picked_in_random_order() {
        let mut world = frontier_world();
        let north = MapPoint::new(26, 12);
        let south = MapPoint::new(26, 20);
        world.add_building(ENEMY, north, BuildingType::Headquarters);
        world.add_building(ENEMY, south, BuildingType::Headquarters);

        let mut picked = AHashSet::new();
        for seed in 0..32 {
            world.clear_commands();
            let config = AiConfig::default().with_seed(seed);
            let mut ai = AiPlayer::new(&world, &config, ME).unwrap();
            assert!(ai.try_to_attack(&mut world));
            if let Some(Command::Attack { target, .. }) = world.commands_of(ME).last() {
                picked.insert(*target);
            }
        }
        assert_eq!(picked.len(), 2);
        assert!(picked.contains(&north) && picked.contains(&south));
    }
}
