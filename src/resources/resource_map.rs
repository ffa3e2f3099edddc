//! Scored grids used to pick building sites
//!
//! Every node that holds a resource radiates a score to its surroundings
//! which falls off linearly with distance. Sites are then chosen by
//! looking for the best score around a point.

use ahash::AHashSet;
use serde::Serialize;

use crate::core::error::Result;
use crate::core::types::{BuildingSize, PlayerId};
use crate::map::grid::Grid;
use crate::map::node::{NodeMap, NodeResource};
use crate::map::point::{MapPoint, MapSize};
use crate::resources::AiResource;
use crate::world::{GameWorld, SubsurfaceResource, SurfaceResource};

/// Desirability grid for one resource kind
#[derive(Debug, Clone)]
pub struct ResourceMap {
    kind: AiResource,
    inexhaustible: bool,
    /// Whether each node holds the resource itself
    sources: Grid<bool>,
    scores: Grid<i32>,
    avoided: AHashSet<MapPoint>,
}

#[derive(Serialize)]
struct ResourceMapDump<'a> {
    kind: AiResource,
    width: u16,
    height: u16,
    scores: Vec<i32>,
    avoided: Vec<&'a MapPoint>,
}

impl ResourceMap {
    pub fn new(kind: AiResource, size: MapSize, inexhaustible: bool) -> Self {
        Self {
            kind,
            inexhaustible,
            sources: Grid::new(size),
            scores: Grid::new(size),
            avoided: AHashSet::new(),
        }
    }

    pub fn kind(&self) -> AiResource {
        self.kind
    }

    pub fn radius(&self) -> u32 {
        self.kind.radius()
    }

    /// Score a node radiates to a point `dist` away
    fn falloff(&self, dist: u32) -> i32 {
        self.radius().saturating_sub(dist) as i32
    }

    fn is_source<W: GameWorld>(
        &self,
        world: &W,
        player: PlayerId,
        nodes: &NodeMap,
        pt: MapPoint,
    ) -> bool {
        let mineral = |res: SubsurfaceResource| world.subsurface_resource(pt) == Some(res);
        match self.kind {
            AiResource::Gold => mineral(SubsurfaceResource::Gold),
            AiResource::Ironore => mineral(SubsurfaceResource::Iron),
            AiResource::Coal => mineral(SubsurfaceResource::Coal),
            AiResource::Granite => mineral(SubsurfaceResource::Granite),
            AiResource::Fish => world.has_fish(pt),
            AiResource::Wood => world.surface_resource(pt) == SurfaceResource::Wood,
            AiResource::Stones => world.surface_resource(pt) == SurfaceResource::Stones,
            AiResource::Plantspace => nodes.get(pt).res == NodeResource::Plantspace,
            // Land we don't hold yet is what military buildings are for
            AiResource::Borderland => {
                world.owner(pt) != Some(player) || world.is_border(player, pt)
            }
        }
    }

    /// Score of `pt` from all sources around it
    ///
    /// Exhaustible resources add up, so bigger deposits win. An
    /// inexhaustible one never runs dry and only the nearest source counts.
    fn score_at(&self, pt: MapPoint) -> i32 {
        let size = self.scores.size();
        let mut total = 0;
        for p in size.points_in_radius(pt, self.radius()) {
            if !self.sources[p] {
                continue;
            }
            let value = self.falloff(size.distance(pt, p));
            if self.inexhaustible {
                total = total.max(value);
            } else {
                total += value;
            }
        }
        total
    }

    /// Compute every score from the current world
    pub fn init<W: GameWorld>(&mut self, world: &W, player: PlayerId, nodes: &NodeMap) {
        let size = self.scores.size();
        for pt in size.points() {
            let source = self.is_source(world, player, nodes, pt);
            self.sources[pt] = source;
        }
        for pt in size.points() {
            let score = self.score_at(pt);
            self.scores[pt] = score;
        }
    }

    /// Re-read sources within `radius` and rescore what they influence
    pub fn update_around<W: GameWorld>(
        &mut self,
        world: &W,
        player: PlayerId,
        nodes: &NodeMap,
        pt: MapPoint,
        radius: u32,
    ) {
        let size = self.scores.size();
        let mut changed = Vec::new();
        for p in size.points_in_radius(pt, radius) {
            let source = self.is_source(world, player, nodes, p);
            if self.sources[p] != source {
                self.sources[p] = source;
                changed.push(p);
            }
        }
        let mut dirty = AHashSet::new();
        for p in changed {
            dirty.extend(size.points_in_radius(p, self.radius()));
        }
        for p in dirty {
            let score = self.score_at(p);
            self.scores[p] = score;
        }
    }

    /// Current score, `None` for avoided nodes
    pub fn value(&self, pt: MapPoint) -> Option<i32> {
        if self.avoided.contains(&pt) {
            None
        } else {
            Some(self.scores[pt])
        }
    }

    /// Never suggest `pt` again
    pub fn avoid_position(&mut self, pt: MapPoint) {
        self.avoided.insert(pt);
    }

    pub fn is_avoided(&self, pt: MapPoint) -> bool {
        self.avoided.contains(&pt)
    }

    /// Best buildable node within `radius` of `around` scoring at least `minimum`
    ///
    /// Candidates must be reachable, owned, not reserved for fields and
    /// have a building quality that fits `size`. Ties go to the node
    /// closest to `around`.
    pub fn find_best_position(
        &self,
        nodes: &NodeMap,
        around: MapPoint,
        size: BuildingSize,
        radius: u32,
        minimum: i32,
    ) -> Option<MapPoint> {
        let mut best: Option<(MapPoint, i32)> = None;
        for pt in nodes.size().points_in_radius(around, radius) {
            let node = nodes.get(pt);
            if !node.reachable || !node.owned || node.farmed || !node.bq.permits(size) {
                continue;
            }
            let Some(score) = self.value(pt) else {
                continue;
            };
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pt, score));
            }
        }
        best.filter(|&(_, score)| score >= minimum).map(|(pt, _)| pt)
    }

    /// JSON dump for offline inspection
    pub fn to_json(&self) -> Result<String> {
        let size = self.scores.size();
        let dump = ResourceMapDump {
            kind: self.kind,
            width: size.width,
            height: size.height,
            scores: self.scores.iter().map(|(_, &v)| v).collect(),
            avoided: self.avoided.iter().collect(),
        };
        Ok(serde_json::to_string(&dump)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;

    const ME: PlayerId = PlayerId(0);

    fn forest() -> SimWorld {
        let mut world = SimWorld::new(40, 32);
        world.claim(ME, MapPoint::new(16, 16), 10);
        world.add_flag(ME, MapPoint::new(16, 22));
        world
    }

    fn wood_map(world: &SimWorld) -> (NodeMap, ResourceMap) {
        let nodes = NodeMap::new(world, ME);
        let mut map = ResourceMap::new(AiResource::Wood, world.map_size(), false);
        map.init(world, ME, &nodes);
        (nodes, map)
    }

    #[test]
    fn test_score_falls_off_with_distance() {
        let mut world = forest();
        world.place_tree(MapPoint::new(16, 16));
        let (_, map) = wood_map(&world);
        assert_eq!(map.value(MapPoint::new(16, 16)), Some(8));
        assert_eq!(map.value(MapPoint::new(19, 16)), Some(5));
        assert_eq!(map.value(MapPoint::new(26, 16)), Some(0));
    }

    #[test]
    fn test_exhaustible_sources_add_up() {
        let mut world = forest();
        world.place_tree(MapPoint::new(16, 16));
        world.place_tree(MapPoint::new(18, 16));
        let (_, map) = wood_map(&world);
        assert_eq!(map.value(MapPoint::new(17, 16)), Some(14));
    }

    #[test]
    fn test_inexhaustible_counts_nearest_only() {
        let mut world = forest();
        world.set_fish(MapPoint::new(16, 16), true);
        world.set_fish(MapPoint::new(18, 16), true);
        let nodes = NodeMap::new(&world, ME);
        let mut map = ResourceMap::new(AiResource::Fish, world.map_size(), true);
        map.init(&world, ME, &nodes);
        assert_eq!(map.value(MapPoint::new(17, 16)), Some(4));
    }

    #[test]
    fn test_felled_tree_rescored() {
        let mut world = forest();
        let tree = MapPoint::new(16, 16);
        world.place_tree(tree);
        let (nodes, mut map) = wood_map(&world);
        world.clear_object(tree);
        map.update_around(&world, ME, &nodes, tree, 1);
        assert_eq!(map.value(tree), Some(0));
        assert_eq!(map.value(MapPoint::new(19, 16)), Some(0));
    }

    #[test]
    fn test_avoided_position_has_no_value() {
        let mut world = forest();
        world.place_tree(MapPoint::new(16, 16));
        let (_, mut map) = wood_map(&world);
        map.avoid_position(MapPoint::new(17, 16));
        assert!(map.is_avoided(MapPoint::new(17, 16)));
        assert_eq!(map.value(MapPoint::new(17, 16)), None);
    }

    #[test]
    fn test_best_position_next_to_source() {
        let mut world = forest();
        let tree = MapPoint::new(16, 16);
        world.place_tree(tree);
        let (nodes, map) = wood_map(&world);
        let best = map.find_best_position(&nodes, tree, BuildingSize::Hut, 4, 1).unwrap();
        assert_eq!(world.map_size().distance(best, tree), 1);
        assert_eq!(map.find_best_position(&nodes, tree, BuildingSize::Hut, 4, 8), None);
    }

    #[test]
    fn test_dump_is_json() {
        let world = forest();
        let (_, map) = wood_map(&world);
        let json = map.to_json().unwrap();
        assert!(json.contains("\"width\":40"));
    }
}
