//! Military decisions
//!
//! Land and sea attacks pick one target per invocation. The troop module
//! keeps one inland building as a training ground and thins out the
//! garrisons of the other interior buildings.

pub mod attack;
pub mod sea;
pub mod troops;

use serde::{Deserialize, Serialize};

use crate::core::types::Job;
use crate::map::point::MapPoint;
use crate::player::AiPlayer;
use crate::world::GameWorld;

/// Soldier ranks handled by troop limits
pub const NUM_SOLDIER_RANKS: u8 = 5;

/// A target considered by an attack round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTarget {
    pub pos: MapPoint,
    pub defenders: u32,
    pub strength: u32,
    /// Military building as opposed to a headquarters or harbor
    pub military: bool,
}

impl AiPlayer {
    /// Soldiers waiting in warehouses, of one rank or of all ranks
    pub fn soldier_available<W: GameWorld>(&self, world: &W, rank: Option<usize>) -> u32 {
        world
            .warehouses(self.player)
            .iter()
            .map(|wh| match rank {
                Some(r) => Job::SOLDIERS.get(r).map_or(0, |&job| wh.inventory.people(job)),
                None => wh.inventory.soldiers(),
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AiConfig;
    use crate::core::types::{BuildingType, PlayerId};
    use crate::world::sim::SimWorld;

    #[test]
    fn test_soldiers_counted_across_warehouses() {
        let mut world = SimWorld::new(40, 40);
        let p = PlayerId(0);
        world.claim(p, MapPoint::new(10, 10), 8);
        world.claim(p, MapPoint::new(28, 10), 8);
        world
            .add_building(p, MapPoint::new(10, 10), BuildingType::Headquarters)
            .inventory
            .add_people(Job::Private, 3);
        let store = world.add_building(p, MapPoint::new(28, 10), BuildingType::Storehouse);
        store.inventory.add_people(Job::Private, 1);
        store.inventory.add_people(Job::General, 2);
        let ai = AiPlayer::new(&world, &AiConfig::default(), p).unwrap();
        assert_eq!(ai.soldier_available(&world, None), 6);
        assert_eq!(ai.soldier_available(&world, Some(0)), 4);
        assert_eq!(ai.soldier_available(&world, Some(4)), 2);
        assert_eq!(ai.soldier_available(&world, Some(9)), 0);
    }
}
