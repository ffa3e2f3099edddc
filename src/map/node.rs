//! Per-node cache of derived facts
//!
//! The cache is filled once when the agent is created and then refreshed
//! locally around every change, so its cost does not grow with map size.

use std::collections::VecDeque;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{BuildingQuality, PlayerId};
use crate::map::grid::Grid;
use crate::map::point::{Direction, MapPoint, MapSize};
use crate::world::{GameWorld, NodeObject, SubsurfaceResource, SurfaceResource};

/// Radius around farms and charburners kept free of other buildings
pub const FARMED_RADIUS: u32 = 3;

/// Resource classification of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeResource {
    #[default]
    Nothing,
    Plantspace,
    Wood,
    Stones,
    Gold,
    Ironore,
    Coal,
    Granite,
    /// Minerals below and something on top
    Multiple,
}

impl From<SubsurfaceResource> for NodeResource {
    fn from(res: SubsurfaceResource) -> Self {
        match res {
            SubsurfaceResource::Gold => NodeResource::Gold,
            SubsurfaceResource::Iron => NodeResource::Ironore,
            SubsurfaceResource::Coal => NodeResource::Coal,
            SubsurfaceResource::Granite => NodeResource::Granite,
            SubsurfaceResource::Water => NodeResource::Nothing,
        }
    }
}

/// Cached state of one map node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    pub bq: BuildingQuality,
    pub res: NodeResource,
    /// A road from one of our flags could get here
    pub reachable: bool,
    /// Remaining visits before an unreachable-marked node is retried
    pub failed_penalty: u32,
    pub owned: bool,
    pub border: bool,
    /// Reserved for fields around a farm or charburner
    pub farmed: bool,
    /// One of our flags stood here at the last refresh
    pub own_flag: bool,
}

/// Classify a node by what lies below and on top of it
pub fn calc_resource<W: GameWorld>(world: &W, pt: MapPoint) -> NodeResource {
    let below = world
        .subsurface_resource(pt)
        .filter(|r| *r != SubsurfaceResource::Water);
    let above = world.surface_resource(pt);

    match below {
        None => match above {
            SurfaceResource::Nothing => {
                if world.is_on_road(pt) || !world.is_vital(pt) {
                    NodeResource::Nothing
                } else {
                    NodeResource::Plantspace
                }
            }
            SurfaceResource::Wood => NodeResource::Wood,
            SurfaceResource::Stones => NodeResource::Stones,
            SurfaceResource::Blocked => NodeResource::Nothing,
        },
        Some(res) => match above {
            SurfaceResource::Wood | SurfaceResource::Stones => NodeResource::Multiple,
            SurfaceResource::Blocked => NodeResource::Nothing,
            SurfaceResource::Nothing => res.into(),
        },
    }
}

/// Derived view of the map for one player
#[derive(Debug, Clone)]
pub struct NodeMap {
    player: PlayerId,
    nodes: Grid<Node>,
}

impl NodeMap {
    /// Build the cache from scratch
    pub fn new<W: GameWorld>(world: &W, player: PlayerId) -> Self {
        let size = world.map_size();
        let mut map = Self {
            player,
            nodes: Grid::new(size),
        };
        map.init_reachable_nodes(world);
        for pt in size.points() {
            let node = &mut map.nodes[pt];
            node.bq = world.building_quality(player, pt);
            node.res = calc_resource(world, pt);
            node.owned = world.owner(pt) == Some(player);
            node.border = world.is_border(player, pt);
            node.farmed = false;
        }
        map
    }

    pub fn size(&self) -> MapSize {
        self.nodes.size()
    }

    pub fn get(&self, pt: MapPoint) -> &Node {
        &self.nodes[pt]
    }

    pub fn get_mut(&mut self, pt: MapPoint) -> &mut Node {
        &mut self.nodes[pt]
    }

    /// Flood fill from every own flag, forgetting all penalties
    pub fn init_reachable_nodes<W: GameWorld>(&mut self, world: &W) {
        let mut queue = VecDeque::new();
        for node in self.nodes.values_mut() {
            node.reachable = false;
            node.failed_penalty = 0;
            node.own_flag = false;
        }
        for flag in world.flags(self.player) {
            self.nodes[flag].reachable = true;
            self.nodes[flag].own_flag = true;
            queue.push_back(flag);
        }
        self.expand_reachable(world, queue);
    }

    /// Breadth-first expansion from known reachable nodes
    ///
    /// A passable node with a pending penalty is not entered yet. Its
    /// penalty drops by one per visit until it may be explored again.
    fn expand_reachable<W: GameWorld>(&mut self, world: &W, mut queue: VecDeque<MapPoint>) {
        let size = self.size();
        while let Some(pt) = queue.pop_front() {
            for next in size.neighbors(pt) {
                let node = &mut self.nodes[next];
                if node.reachable || !world.is_road_node_ok(next) {
                    continue;
                }
                if node.failed_penalty == 0 {
                    node.reachable = true;
                    queue.push_back(next);
                } else {
                    node.failed_penalty -= 1;
                }
            }
        }
    }

    /// Recompute reachability of `pts` after a change inside them
    ///
    /// As long as nothing reachable got lost, the old marks outside the
    /// region stay valid: the region is cleared and refilled from own flags
    /// inside it and from reachable nodes bordering it. A lost flag or a
    /// reachable node that became impassable may cut off nodes anywhere,
    /// so the whole map is filled again.
    pub fn update_reachable_nodes<W: GameWorld>(&mut self, world: &W, pts: &[MapPoint]) {
        let lost = pts.iter().any(|&pt| {
            let node = &self.nodes[pt];
            let own_flag = self.is_own_flag(world, pt);
            let cut_off = node.reachable && !own_flag && !world.is_road_node_ok(pt);
            (node.own_flag && !own_flag) || cut_off
        });
        if lost {
            debug!(player = self.player.0, "reachable area shrank, refilling");
            self.init_reachable_nodes(world);
            return;
        }

        let size = self.size();
        let region: AHashSet<MapPoint> = pts.iter().copied().collect();
        let mut queue = VecDeque::new();
        for &pt in pts {
            let own_flag = self.is_own_flag(world, pt);
            let node = &mut self.nodes[pt];
            node.own_flag = own_flag;
            node.reachable = own_flag;
            if own_flag {
                queue.push_back(pt);
            }
        }
        for &pt in pts {
            for next in size.neighbors(pt) {
                if self.nodes[next].reachable && !region.contains(&next) {
                    queue.push_back(next);
                }
            }
        }
        self.expand_reachable(world, queue);
    }

    fn is_own_flag<W: GameWorld>(&self, world: &W, pt: MapPoint) -> bool {
        matches!(world.object_at(pt), NodeObject::Flag { owner } if owner == self.player)
    }

    /// Refresh ownership, border, buildability, resources and reachability
    pub fn update_nodes_around<W: GameWorld>(&mut self, world: &W, pt: MapPoint, radius: u32) {
        let pts = self.size().points_in_radius(pt, radius);
        self.update_reachable_nodes(world, &pts);
        for &p in &pts {
            let node = &mut self.nodes[p];
            node.bq = world.building_quality(self.player, p);
            node.owned = world.owner(p) == Some(self.player);
            node.border = world.is_border(self.player, p);
            node.res = calc_resource(world, p);
        }
    }

    /// Mark or clear field space around a farm or charburner
    pub fn set_farmed(&mut self, pt: MapPoint, farmed: bool) {
        for p in self.size().points_in_radius(pt, FARMED_RADIUS) {
            self.nodes[p].farmed = farmed;
        }
    }

    /// Percentage of nodes within `radius` classified as `res`
    pub fn density<W: GameWorld>(
        &self,
        world: &W,
        pt: MapPoint,
        res: NodeResource,
        radius: u32,
    ) -> u32 {
        let pts = self.size().points_in_radius(pt, radius);
        let good = pts.iter().filter(|&&p| calc_resource(world, p) == res).count();
        (good * 100 / pts.len()) as u32
    }

    /// Roads spoil plant space under a building, its flag and the route
    pub fn recalc_ground(&mut self, building: MapPoint, route: &[Direction]) {
        let size = self.size();
        let flag = size.neighbor(building, Direction::SouthEast);
        let mut touched = vec![building, flag];
        let mut cur = flag;
        for &dir in route {
            cur = size.neighbor(cur, dir);
            touched.push(cur);
        }
        for p in touched {
            let node = &mut self.nodes[p];
            if node.res == NodeResource::Plantspace {
                node.res = NodeResource::Nothing;
            }
        }
    }

    /// Refresh the cached quality of single nodes
    pub fn refresh_bq<W: GameWorld>(&mut self, world: &W, pts: &[MapPoint]) {
        for &pt in pts {
            self.nodes[pt].bq = world.building_quality(self.player, pt);
        }
    }
}
