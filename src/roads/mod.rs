//! Pruning of the flag graph
//!
//! Roads the agent built speculatively stay behind when buildings burn or
//! land is lost. Flags with at most one road (or two roads on a small
//! circle) are removed, and the check cascades to the flags at the other
//! end. Flags in front of a building or site are never touched; they are
//! reported so the caller can reconnect them.

use ahash::AHashSet;
use tracing::{debug, trace};

use crate::construction::Job;
use crate::map::point::{Direction, MapPoint};
use crate::player::AiPlayer;
use crate::world::{Command, FlagInfo, GameWorld};

/// Flags within this radius are checked after losing land or buildings
pub const PRUNE_RADIUS: u32 = 25;
/// Longest circle that makes a two-road flag redundant
pub const MAX_CIRCLE_LEN: u32 = 10;

/// Whether the flag is the entrance of a building or building site
pub fn is_building_flag<W: GameWorld>(world: &W, flag: MapPoint) -> bool {
    let building = world.map_size().neighbor(flag, Direction::NorthWest);
    world.object_at(building).is_building_or_site()
}

/// Whether a path of at most `max_len` roads leads from `start` back to it
///
/// Building entrances are not passed through. A flag appears at most once
/// on each path, but different paths may share flags.
pub fn is_flag_part_of_circle<W: GameWorld>(world: &W, start: MapPoint, max_len: u32) -> bool {
    let mut path = Vec::new();
    circle_from(world, start, start, None, max_len, &mut path)
}

fn circle_from<W: GameWorld>(
    world: &W,
    start: MapPoint,
    cur: MapPoint,
    came_from: Option<Direction>,
    budget: u32,
    path: &mut Vec<MapPoint>,
) -> bool {
    if cur == start && !path.is_empty() {
        return true;
    }
    if budget == 0 {
        return false;
    }
    let Some(flag) = world.flag(cur) else {
        return false;
    };
    for dir in Direction::ALL {
        if Some(dir) == came_from || (dir == Direction::NorthWest && is_building_flag(world, cur)) {
            continue;
        }
        let Some(road) = flag.route(dir) else {
            continue;
        };
        if path.contains(&road.other_flag) {
            continue;
        }
        path.push(road.other_flag);
        let next = road.other_flag;
        let found = circle_from(world, start, next, Some(road.other_dir), budget - 1, path);
        path.pop();
        if found {
            return true;
        }
    }
    false
}

/// Roads leaving `flag`, skipping `exclude`
fn routes_except(
    flag: &FlagInfo,
    exclude: Option<Direction>,
) -> Vec<(Direction, MapPoint, Direction)> {
    Direction::ALL
        .iter()
        .filter(|&&dir| Some(dir) != exclude)
        .filter_map(|&dir| flag.route(dir).map(|r| (dir, r.other_flag, r.other_dir)))
        .collect()
}

impl AiPlayer {
    /// Remove `start` if nothing needs it and cascade to its neighbours
    ///
    /// Returns true only when `start` is the entrance of a building or
    /// site, i.e. it should get a road instead of being removed. With
    /// `keep_start_flag` only the road is destroyed.
    pub fn remove_unused_road<W: GameWorld>(
        &mut self,
        world: &mut W,
        start: MapPoint,
        exclude_dir: Option<Direction>,
        first_flag: bool,
        allow_circle: bool,
        keep_start_flag: bool,
    ) -> bool {
        let mut visited: AHashSet<MapPoint> = AHashSet::new();
        let mut pending = vec![(start, exclude_dir, first_flag, allow_circle, keep_start_flag)];
        let mut needs_road = false;
        while let Some((pos, exclude, first, circle, keep)) = pending.pop() {
            if !visited.insert(pos) {
                continue;
            }
            let Some(flag) = world.flag(pos).filter(|f| f.owner == self.player) else {
                continue;
            };
            if exclude != Some(Direction::NorthWest) && is_building_flag(world, pos) {
                if pos == start {
                    needs_road = true;
                }
                continue;
            }
            let routes = routes_except(&flag, exclude);
            let removable = match routes.len() {
                0 | 1 => true,
                2 => circle && first && is_flag_part_of_circle(world, pos, MAX_CIRCLE_LEN),
                _ => false,
            };
            if !removable {
                continue;
            }
            if keep {
                if let Some(&(dir, _, _)) = routes.first() {
                    world.issue(self.player, Command::DestroyRoad { flag: pos, dir });
                }
            } else {
                trace!(player = self.player.0, %pos, roads = routes.len(), "removing unused flag");
                world.issue(self.player, Command::DestroyFlag { pos });
            }
            for &(_, other, other_dir) in &routes {
                pending.push((other, Some(other_dir), false, true, false));
            }
        }
        needs_road
    }

    /// Prune around `pt` and reconnect the building flags that remain
    ///
    /// Passes repeat until one removes nothing, so an immediate second
    /// call finds nothing left to do.
    pub fn remove_all_unused_roads<W: GameWorld>(&mut self, world: &mut W, pt: MapPoint) {
        let mut reconnect: Vec<MapPoint> = Vec::new();
        loop {
            let flags = self.find_flags(world, pt, PRUNE_RADIUS);
            let before = flags.len();
            for flag in flags {
                if world.flag(flag).is_none() {
                    continue;
                }
                let needs_road = self.remove_unused_road(world, flag, None, true, false, false);
                if needs_road && !reconnect.contains(&flag) {
                    reconnect.push(flag);
                }
            }
            if self.find_flags(world, pt, PRUNE_RADIUS).len() == before {
                break;
            }
        }
        self.nodes.update_nodes_around(world, pt, PRUNE_RADIUS);
        debug!(player = self.player.0, %pt, reconnect = reconnect.len(), "roads pruned");
        for flag in reconnect {
            if world.flag(flag).is_some() {
                self.construction.add_connect_job(Job::connect(flag));
            }
        }
    }

    /// Queue connect jobs for sites whose flag has no road
    ///
    /// Only when no other job is waiting.
    pub fn check_for_unconnected_building_sites<W: GameWorld>(&mut self, world: &W) {
        if self.construction.has_jobs() {
            return;
        }
        let size = world.map_size();
        for site in world.building_sites(self.player) {
            let flag = size.neighbor(site.pos, Direction::SouthEast);
            let Some(info) = world.flag(flag) else {
                continue;
            };
            let has_road = Direction::ALL
                .iter()
                .any(|&dir| dir != Direction::NorthWest && info.route(dir).is_some());
            if !has_road {
                self.construction.add_connect_job(Job::connect(flag));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AiConfig;
    use crate::core::types::{BuildingType, PlayerId};
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);

    fn world() -> SimWorld {
        let mut world = SimWorld::new(40, 40);
        world.claim(ME, MapPoint::new(20, 20), 15);
        world
    }

    #[test]
    fn test_dead_end_flag_removed_with_its_branch() {
        let mut w = world();
        let a = MapPoint::new(10, 20);
        let b = MapPoint::new(14, 20);
        let c = MapPoint::new(18, 20);
        w.add_road(ME, a, vec![Direction::East; 4]);
        w.add_road(ME, b, vec![Direction::East; 4]);
        let mut ai = AiPlayer::new(&w, &AiConfig::default(), ME).unwrap();
        assert!(!ai.remove_unused_road(&mut w, c, None, true, false, false));
        assert!(!w.has_flag(c));
        assert!(!w.has_flag(b));
        assert!(!w.has_flag(a));
        assert_eq!(w.road_count(), 0);
    }

    #[test]
    fn test_building_flag_is_kept_and_reported() {
        let mut w = world();
        let pos = MapPoint::new(20, 20);
        w.add_site(ME, pos, BuildingType::Woodcutter);
        let flag = w.map_size().neighbor(pos, Direction::SouthEast);
        let mut ai = AiPlayer::new(&w, &AiConfig::default(), ME).unwrap();
        assert!(ai.remove_unused_road(&mut w, flag, None, true, false, false));
        assert!(w.has_flag(flag));
        assert!(w.building(pos).is_some());
    }

    #[test]
    fn test_junction_kept() {
        let mut w = world();
        let hub = MapPoint::new(20, 20);
        w.add_road(ME, hub, vec![Direction::East; 3]);
        w.add_road(ME, hub, vec![Direction::West; 3]);
        w.add_road(ME, hub, vec![Direction::SouthEast; 3]);
        let mut ai = AiPlayer::new(&w, &AiConfig::default(), ME).unwrap();
        ai.remove_unused_road(&mut w, hub, None, true, false, false);
        assert!(w.has_flag(hub));
        assert_eq!(w.road_count(), 3);
    }

    #[test]
    fn test_through_flag_kept_without_circle() {
        let mut w = world();
        let mid = MapPoint::new(20, 20);
        w.add_road(ME, mid, vec![Direction::East; 3]);
        w.add_road(ME, mid, vec![Direction::West; 3]);
        let mut ai = AiPlayer::new(&w, &AiConfig::default(), ME).unwrap();
        ai.remove_unused_road(&mut w, mid, None, true, true, false);
        assert!(w.has_flag(mid));
    }

    #[test]
    fn test_keep_start_flag_destroys_only_the_road() {
        let mut w = world();
        let a = MapPoint::new(10, 20);
        w.add_road(ME, a, vec![Direction::East; 4]);
        let mut ai = AiPlayer::new(&w, &AiConfig::default(), ME).unwrap();
        ai.remove_unused_road(&mut w, a, None, true, true, true);
        assert!(w.has_flag(a));
        assert_eq!(w.road_count(), 0);
    }

    #[test]
    fn test_unconnected_site_gets_connect_job() {
        let mut w = world();
        w.add_site(ME, MapPoint::new(20, 20), BuildingType::Sawmill);
        let mut ai = AiPlayer::new(&w, &AiConfig::default(), ME).unwrap();
        ai.check_for_unconnected_building_sites(&w);
        assert_eq!(ai.construction().connect_job_count(), 1);
    }
}
