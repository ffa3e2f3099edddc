//! Resource maps, one per resource kind

pub mod resource_map;

use serde::{Deserialize, Serialize};

use crate::core::types::{BuildingSize, PlayerId};
use crate::map::node::NodeMap;
use crate::map::point::MapPoint;
use crate::world::{GameSettings, GameWorld};

pub use resource_map::ResourceMap;

/// Kinds of resources the AI keeps a score map for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiResource {
    Gold,
    Ironore,
    Coal,
    Granite,
    Fish,
    Wood,
    Stones,
    Plantspace,
    /// Unclaimed or contested land next to our border
    Borderland,
}

impl AiResource {
    pub const ALL: [AiResource; 9] = [
        AiResource::Gold,
        AiResource::Ironore,
        AiResource::Coal,
        AiResource::Granite,
        AiResource::Fish,
        AiResource::Wood,
        AiResource::Stones,
        AiResource::Plantspace,
        AiResource::Borderland,
    ];

    /// How far one resource node influences scores
    pub fn radius(self) -> u32 {
        match self {
            AiResource::Gold | AiResource::Ironore | AiResource::Coal | AiResource::Granite => 2,
            AiResource::Fish | AiResource::Plantspace | AiResource::Borderland => 5,
            AiResource::Wood | AiResource::Stones => 8,
        }
    }

    /// Whether game settings make this resource never run out
    pub fn is_inexhaustible(self, settings: &GameSettings) -> bool {
        match self {
            AiResource::Gold | AiResource::Ironore | AiResource::Coal => {
                settings.inexhaustible_mines
            }
            AiResource::Granite => settings.inexhaustible_mines || settings.inexhaustible_granite,
            AiResource::Fish => settings.inexhaustible_fish,
            _ => false,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// All resource maps of one player
#[derive(Debug, Clone)]
pub struct ResourceMaps {
    maps: Vec<ResourceMap>,
}

impl ResourceMaps {
    pub fn new<W: GameWorld>(world: &W, player: PlayerId, nodes: &NodeMap) -> Self {
        let settings = world.game_settings();
        let maps = AiResource::ALL
            .iter()
            .map(|&kind| {
                let mut map =
                    ResourceMap::new(kind, world.map_size(), kind.is_inexhaustible(&settings));
                map.init(world, player, nodes);
                map
            })
            .collect();
        Self { maps }
    }

    pub fn get(&self, kind: AiResource) -> &ResourceMap {
        &self.maps[kind.index()]
    }

    pub fn get_mut(&mut self, kind: AiResource) -> &mut ResourceMap {
        &mut self.maps[kind.index()]
    }

    /// Refresh every map around a changed point
    pub fn update_all_around<W: GameWorld>(
        &mut self,
        world: &W,
        player: PlayerId,
        nodes: &NodeMap,
        pt: MapPoint,
        radius: u32,
    ) {
        for map in &mut self.maps {
            map.update_around(world, player, nodes, pt, radius);
        }
    }

    /// Refresh one map around `around`, then search it
    #[allow(clippy::too_many_arguments)]
    pub fn find_best_position<W: GameWorld>(
        &mut self,
        world: &W,
        player: PlayerId,
        nodes: &NodeMap,
        kind: AiResource,
        around: MapPoint,
        size: BuildingSize,
        radius: u32,
        minimum: i32,
    ) -> Option<MapPoint> {
        let map = self.get_mut(kind);
        map.update_around(world, player, nodes, around, radius);
        map.find_best_position(nodes, around, size, radius, minimum)
    }
}
