//! Property tests for the cached reachability of map nodes
//!
//! Reachability must equal a plain flood fill from the own flags over
//! passable nodes, right after building the cache, after any local
//! refresh of an unchanged world, and after a refresh around changes.

use std::collections::VecDeque;

use proptest::prelude::*;

use colony_ai::core::types::PlayerId;
use colony_ai::map::node::NodeMap;
use colony_ai::map::point::MapPoint;
use colony_ai::world::sim::SimWorld;
use colony_ai::GameWorld;

const ME: PlayerId = PlayerId(0);
const SIZE: u16 = 24;

fn world_with_obstacles(flags: &[(u16, u16)], obstacles: &[(u16, u16)]) -> SimWorld {
    let mut world = SimWorld::new(SIZE, SIZE);
    world.claim(ME, MapPoint::new(SIZE / 2, SIZE / 2), 20);
    for &(x, y) in obstacles {
        world.place_granite(MapPoint::new(x, y));
    }
    for &(x, y) in flags {
        let pt = MapPoint::new(x, y);
        world.clear_object(pt);
        world.add_flag(ME, pt);
    }
    world
}

/// Reference flood fill, independent of the cache
fn flood_fill(world: &SimWorld) -> Vec<MapPoint> {
    let size = world.map_size();
    let mut seen: Vec<MapPoint> = world.flags(ME);
    let mut queue: VecDeque<MapPoint> = seen.iter().copied().collect();
    while let Some(pt) = queue.pop_front() {
        for next in size.neighbors(pt) {
            if !seen.contains(&next) && world.is_road_node_ok(next) {
                seen.push(next);
                queue.push_back(next);
            }
        }
    }
    seen.sort_unstable();
    seen
}

/// Put or take away a flag or granite at `pt`
fn apply_change(world: &mut SimWorld, pt: MapPoint, change: u8) {
    match change {
        0 => world.place_granite(pt),
        1 => world.clear_object(pt),
        _ => {
            world.clear_object(pt);
            world.add_flag(ME, pt);
        }
    }
}

fn cached(nodes: &NodeMap, world: &SimWorld) -> Vec<MapPoint> {
    let mut reachable: Vec<MapPoint> = world
        .map_size()
        .points()
        .filter(|&pt| nodes.get(pt).reachable)
        .collect();
    reachable.sort_unstable();
    reachable
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A fresh cache matches the flood fill
    #[test]
    fn prop_fresh_cache_matches_flood_fill(
        flags in prop::collection::vec((0u16..SIZE, 0u16..SIZE), 1..4),
        obstacles in prop::collection::vec((0u16..SIZE, 0u16..SIZE), 0..160),
    ) {
        let world = world_with_obstacles(&flags, &obstacles);
        let nodes = NodeMap::new(&world, ME);
        prop_assert_eq!(cached(&nodes, &world), flood_fill(&world));
    }

    /// Refreshing any region of an unchanged world changes nothing
    #[test]
    fn prop_local_refresh_is_stable(
        flags in prop::collection::vec((0u16..SIZE, 0u16..SIZE), 1..4),
        obstacles in prop::collection::vec((0u16..SIZE, 0u16..SIZE), 0..160),
        center in (0u16..SIZE, 0u16..SIZE),
        radius in 1u32..10,
    ) {
        let world = world_with_obstacles(&flags, &obstacles);
        let mut nodes = NodeMap::new(&world, ME);
        let before = cached(&nodes, &world);
        nodes.update_nodes_around(&world, MapPoint::new(center.0, center.1), radius);
        prop_assert_eq!(cached(&nodes, &world), before);
    }

    /// Refreshing the changed region gives the same result as a new cache
    #[test]
    fn prop_refresh_after_changes_matches_new_cache(
        flags in prop::collection::vec((0u16..SIZE, 0u16..SIZE), 1..4),
        obstacles in prop::collection::vec((0u16..SIZE, 0u16..SIZE), 0..160),
        center in (0u16..SIZE, 0u16..SIZE),
        radius in 1u32..6,
        changes in prop::collection::vec((any::<prop::sample::Index>(), 0u8..3), 1..8),
    ) {
        let mut world = world_with_obstacles(&flags, &obstacles);
        let mut nodes = NodeMap::new(&world, ME);
        let center = MapPoint::new(center.0, center.1);
        let region = world.map_size().points_in_radius(center, radius);
        for (index, change) in changes {
            apply_change(&mut world, *index.get(&region), change);
        }
        nodes.update_nodes_around(&world, center, radius);
        prop_assert_eq!(cached(&nodes, &world), cached(&NodeMap::new(&world, ME), &world));
        prop_assert_eq!(cached(&nodes, &world), flood_fill(&world));
    }
}
