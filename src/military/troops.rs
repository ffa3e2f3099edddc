//! Garrison management and soldier upgrades
//!
//! One inland watchtower or fortress connected to the roads becomes the
//! upgrade building: it gets coins and keeps low-rank soldiers so they
//! train there. Other interior buildings send their soldiers away and are
//! cut off from the roads once only one soldier is left.

use tracing::debug;

use crate::core::types::{BuildingType, FrontierDistance};
use crate::map::point::{Direction, MapPoint};
use crate::military::NUM_SOLDIER_RANKS;
use crate::player::AiPlayer;
use crate::world::{Command, GameWorld, MilitaryInfo};

impl AiPlayer {
    /// Find the upgrade building; returns its index in the military list
    ///
    /// Candidates that lost their road connection get connect jobs.
    pub fn update_upgrade_building<W: GameWorld>(&mut self, world: &W) -> Option<usize> {
        let military = world.military_buildings(self.player);
        let mut backup = Vec::new();
        if !world.warehouses(self.player).is_empty() {
            for (idx, bld) in military.iter().enumerate() {
                if !matches!(bld.kind, BuildingType::Watchtower | BuildingType::Fortress)
                    || bld.frontier != FrontierDistance::Far
                {
                    continue;
                }
                let flag = world.map_size().neighbor(bld.pos, Direction::SouthEast);
                if self.is_connected_to_road_system(world, flag) {
                    self.upgrade_bld_pos = Some(bld.pos);
                    return Some(idx);
                }
                backup.push(flag);
            }
        }
        for flag in backup {
            self.add_connect_job(flag);
        }
        self.upgrade_bld_pos = None;
        None
    }

    /// Interior buildings that stay connected and staffed: `max(6, military / 5)`
    pub(crate) fn planned_connected_inland_military(&self, military: usize) -> usize {
        (military / 5).max(6)
    }

    pub(crate) fn has_frontier_buildings<W: GameWorld>(&self, world: &W) -> bool {
        world
            .military_buildings(self.player)
            .iter()
            .any(|b| b.frontier != FrontierDistance::Far)
    }

    /// Rebalance coins and troop limits around the upgrade building
    pub fn mil_upgrade_optim<W: GameWorld>(&mut self, world: &mut W) {
        let upgrade = self.update_upgrade_building(world);
        let military = world.military_buildings(self.player);
        let planned = self.planned_connected_inland_military(military.len());
        let size = world.map_size();
        for (idx, bld) in military.iter().enumerate() {
            let flag = size.neighbor(bld.pos, Direction::SouthEast);
            if Some(idx) == upgrade {
                if !self.is_connected_to_road_system(world, flag) {
                    self.add_connect_job(flag);
                    continue;
                }
                self.staff_upgrade_building(world, bld);
                continue;
            }
            if upgrade.is_none() {
                if bld.gold_disabled && bld.frontier != FrontierDistance::Far {
                    let enable = Command::SetCoinsAllowed { pos: bld.pos, enabled: true };
                    world.issue(self.player, enable);
                }
                continue;
            }
            if !bld.gold_disabled {
                world.issue(self.player, Command::SetCoinsAllowed { pos: bld.pos, enabled: false });
            }
            if bld.frontier == FrontierDistance::Far && idx + planned < military.len() {
                if bld.troops > 1 {
                    self.send_troops_away(world, bld.pos, bld.max_troops());
                } else if !bld.new_built {
                    debug!(
                        player = self.player.0,
                        pos = %bld.pos,
                        "disconnecting interior building"
                    );
                    let exclude = Some(Direction::NorthWest);
                    self.remove_unused_road(world, flag, exclude, true, true, true);
                }
            } else if bld.frontier != FrontierDistance::Far {
                self.add_connect_job(flag);
            }
        }
    }

    /// Keep one private, send everyone else back, then lift the limits again
    fn send_troops_away<W: GameWorld>(&self, world: &mut W, pos: MapPoint, max: u32) {
        world.issue(self.player, Command::SetTroopLimit { pos, rank: 0, limit: 1 });
        for rank in 1..NUM_SOLDIER_RANKS {
            world.issue(self.player, Command::SetTroopLimit { pos, rank, limit: 0 });
        }
        for rank in 0..NUM_SOLDIER_RANKS {
            world.issue(self.player, Command::SetTroopLimit { pos, rank, limit: max });
        }
    }

    /// Coins on, no soldiers of the top rank, one of every middle rank
    fn staff_upgrade_building<W: GameWorld>(&self, world: &mut W, bld: &MilitaryInfo) {
        if bld.gold_disabled {
            world.issue(self.player, Command::SetCoinsAllowed { pos: bld.pos, enabled: true });
        }
        let max_rank = world.game_settings().max_military_rank.min(NUM_SOLDIER_RANKS - 1);
        world.issue(
            self.player,
            Command::SetTroopLimit { pos: bld.pos, rank: 0, limit: bld.max_troops() },
        );
        for rank in 1..max_rank {
            world.issue(self.player, Command::SetTroopLimit { pos: bld.pos, rank, limit: 1 });
        }
        world.issue(self.player, Command::SetTroopLimit { pos: bld.pos, rank: max_rank, limit: 0 });
    }

    /// Occupation level for mid-distance buildings, 4 to 8
    ///
    /// Soldiers bound at the front, at harbors, in the connected interior
    /// and one per disconnected interior building are fixed. The highest
    /// level whose mid-distance demand still fits into ten elevenths of
    /// all soldiers wins; the current level is kept while it fits at all.
    pub fn calc_mil_settings<W: GameWorld>(&mut self, world: &W) -> u8 {
        let soldiers = world.inventory(self.player).soldiers();
        let upgrade = self.update_upgrade_building(world);
        let military = world.military_buildings(self.player);
        let planned = self.planned_connected_inland_military(military.len());

        let mut inland = [0u32; 5];
        let mut fixed = 0u32;
        for (idx, bld) in military.iter().enumerate() {
            let connected_interior = bld.frontier == FrontierDistance::Far
                && (military.len() < idx + planned || Some(idx) == upgrade);
            match bld.frontier {
                FrontierDistance::Near | FrontierDistance::Harbor => {
                    fixed += bld.required_troops(8)
                }
                FrontierDistance::Far if connected_interior => fixed += bld.required_troops(8),
                FrontierDistance::Mid => {
                    for (i, need) in inland.iter_mut().enumerate() {
                        *need += bld.required_troops(4 + i as u32);
                    }
                }
                FrontierDistance::Far => fixed += 1,
            }
        }

        let current = world.military_settings(self.player).0[5];
        let mut level = 8u8;
        while level > 4 {
            let need = fixed + inland[(level - 4) as usize];
            if need < soldiers * 10 / 11 || (current >= level && need < soldiers) {
                break;
            }
            level -= 1;
        }
        level
    }
}
