//! The game world as seen by an autonomous player
//!
//! The AI never touches world state directly. It observes through the
//! read-only queries of [`GameWorld`] and changes things by issuing
//! [`Command`]s. Outcomes come back later as notifications.

pub mod command;
pub mod notify;
pub mod sim;

use serde::{Deserialize, Serialize};

use crate::core::types::{
    BuildingQuality, BuildingType, FrontierDistance, Inventory, InventorySetting, MilitarySettings,
    PlayerId, SeaId, ShipId, StockItem, ToolSettings,
};
use crate::map::point::{Direction, MapPoint, MapSize};

pub use command::Command;
pub use notify::{Note, NotificationBus, Subscription};

/// Mineable resource below a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubsurfaceResource {
    Gold,
    Iron,
    Coal,
    Granite,
    Water,
}

/// What grows or lies on top of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SurfaceResource {
    #[default]
    Nothing,
    Wood,
    Stones,
    /// Some object prevents any use of the node
    Blocked,
}

/// Static object occupying a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NodeObject {
    #[default]
    Nothing,
    Flag { owner: PlayerId },
    Building { owner: PlayerId, kind: BuildingType },
    BuildingSite { owner: PlayerId, kind: BuildingType },
    Tree { produces_wood: bool },
    Granite,
    Other,
}

impl NodeObject {
    /// Building or building site
    pub fn is_building_or_site(&self) -> bool {
        matches!(self, NodeObject::Building { .. } | NodeObject::BuildingSite { .. })
    }
}

/// One road leaving a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadInfo {
    /// Flag at the far end
    pub other_flag: MapPoint,
    /// Direction in which the road leaves the far flag
    pub other_dir: Direction,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagInfo {
    pub pos: MapPoint,
    pub owner: PlayerId,
    /// Roads indexed by [`Direction::index`]
    pub routes: [Option<RoadInfo>; 6],
}

impl FlagInfo {
    pub fn route(&self, dir: Direction) -> Option<&RoadInfo> {
        self.routes[dir.index()].as_ref()
    }

    pub fn route_count(&self) -> usize {
        self.routes.iter().filter(|r| r.is_some()).count()
    }
}

/// Production building of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingInfo {
    pub pos: MapPoint,
    pub kind: BuildingType,
    pub has_worker: bool,
    /// Percent of possible output produced recently
    pub productivity: u32,
    /// Input wares waiting inside the building
    pub wares: u32,
    pub ordered_wares: bool,
    pub production_disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub pos: MapPoint,
    pub kind: BuildingType,
}

/// Military building of the querying player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitaryInfo {
    pub pos: MapPoint,
    pub kind: BuildingType,
    pub frontier: FrontierDistance,
    pub troops: u32,
    pub troop_limits: [u32; 5],
    pub gold_disabled: bool,
    /// Never had a soldier inside yet
    pub new_built: bool,
    pub under_attack: bool,
    /// Neither guards land nor borders anything worth holding
    pub useless: bool,
    pub demolition_allowed: bool,
}

impl MilitaryInfo {
    pub fn max_troops(&self) -> u32 {
        self.kind.max_soldiers()
    }

    /// Soldiers needed to occupy at `setting` out of 8
    pub fn required_troops(&self, setting: u32) -> u32 {
        ((self.max_troops() * setting + 7) / 8).max(1)
    }
}

/// Warehouse, harbor or headquarters of the querying player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseInfo {
    pub pos: MapPoint,
    pub kind: BuildingType,
    pub inventory: Inventory,
    pub settings: Vec<(StockItem, InventorySetting)>,
    pub expedition_active: bool,
}

impl WarehouseInfo {
    pub fn setting(&self, item: StockItem) -> InventorySetting {
        self.settings
            .iter()
            .find(|(i, _)| *i == item)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    pub fn is_harbor(&self) -> bool {
        self.kind == BuildingType::HarborBuilding
    }
}

/// Any player's garrisoned building, as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitarySighting {
    pub pos: MapPoint,
    pub owner: PlayerId,
    pub kind: BuildingType,
    pub defenders: u32,
    pub strength: u32,
    pub new_built: bool,
    pub under_attack: bool,
}

impl MilitarySighting {
    /// Headquarters and harbors can be attacked but aren't military buildings
    pub fn is_military_building(&self) -> bool {
        self.kind.is_military()
    }
}

/// Soldiers that could join an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackForce {
    pub soldiers: u32,
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarborPoint {
    pub pos: MapPoint,
    /// Seas touching this harbor spot
    pub seas: Vec<SeaId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipInfo {
    pub id: ShipId,
    pub pos: MapPoint,
    pub sea: SeaId,
    pub waiting_for_expedition: bool,
    pub can_found_colony: bool,
}

/// Direction a ship explores in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipDirection {
    North,
    NorthEast,
    SouthEast,
    South,
    SouthWest,
    NorthWest,
}

impl ShipDirection {
    pub const ALL: [ShipDirection; 6] = [
        ShipDirection::North,
        ShipDirection::NorthEast,
        ShipDirection::SouthEast,
        ShipDirection::South,
        ShipDirection::SouthWest,
        ShipDirection::NorthWest,
    ];
}

/// Game-wide rules the AI adapts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameSettings {
    pub inexhaustible_mines: bool,
    pub inexhaustible_granite: bool,
    pub inexhaustible_fish: bool,
    pub sea_attack: bool,
    /// Highest soldier rank index, 0 means only privates
    pub max_military_rank: u8,
}

/// Queries and commands an autonomous player needs
pub trait GameWorld {
    // === MAP ===
    fn map_size(&self) -> MapSize;
    /// Building quality for `player` (own territory only)
    fn building_quality(&self, player: PlayerId, pt: MapPoint) -> BuildingQuality;
    /// Building quality ignoring ownership
    fn building_quality_any_owner(&self, pt: MapPoint) -> BuildingQuality;
    fn subsurface_resource(&self, pt: MapPoint) -> Option<SubsurfaceResource>;
    fn surface_resource(&self, pt: MapPoint) -> SurfaceResource;
    /// Terrain around the node lets plants grow
    fn is_vital(&self, pt: MapPoint) -> bool;
    fn is_on_road(&self, pt: MapPoint) -> bool;
    /// Passability predicate for new roads
    fn is_road_node_ok(&self, pt: MapPoint) -> bool;
    fn owner(&self, pt: MapPoint) -> Option<PlayerId>;
    fn is_border(&self, player: PlayerId, pt: MapPoint) -> bool;
    fn is_visible(&self, player: PlayerId, pt: MapPoint) -> bool;
    fn has_fish(&self, pt: MapPoint) -> bool;
    fn object_at(&self, pt: MapPoint) -> NodeObject;
    fn flag(&self, pt: MapPoint) -> Option<FlagInfo>;
    fn flags(&self, player: PlayerId) -> Vec<MapPoint>;
    /// Steps of the road leaving `flag` in `dir`, up to the far flag
    fn road_route(&self, flag: MapPoint, dir: Direction) -> Option<Vec<Direction>>;
    /// Positions of huntable animals within `radius`
    fn huntable_animals(&self, pt: MapPoint, radius: u32) -> Vec<MapPoint>;

    // === PATHS ===
    /// Walking distance from `from` to `to`, if at most `max_len`
    fn find_human_path(&self, from: MapPoint, to: MapPoint, max_len: u32) -> Option<u32>;
    /// Route for a new road between two flags
    fn find_free_path_for_new_road(
        &self,
        player: PlayerId,
        from_flag: MapPoint,
        to_flag: MapPoint,
        max_len: u32,
    ) -> Option<Vec<Direction>>;
    /// Length of the shortest path over existing roads
    fn road_distance(
        &self,
        player: PlayerId,
        from_flag: MapPoint,
        to_flag: MapPoint,
        max_len: u32,
    ) -> Option<u32>;

    // === BUILDINGS ===
    fn buildings(&self, player: PlayerId) -> Vec<BuildingInfo>;
    fn building_sites(&self, player: PlayerId) -> Vec<SiteInfo>;
    fn military_buildings(&self, player: PlayerId) -> Vec<MilitaryInfo>;
    fn warehouses(&self, player: PlayerId) -> Vec<WarehouseInfo>;
    /// Garrisoned buildings of every player within `radius`
    fn military_buildings_near(&self, pt: MapPoint, radius: u32) -> Vec<MilitarySighting>;
    fn military_building_at(&self, pt: MapPoint) -> Option<MilitarySighting>;
    fn is_attackable(&self, player: PlayerId, other: PlayerId) -> bool;
    /// Soldiers the building at `from` could send against `target`
    fn soldiers_for_attack(&self, from: MapPoint, target: MapPoint) -> AttackForce;

    // === SEA ===
    fn harbor_points(&self) -> Vec<HarborPoint>;
    fn is_harbor_point_free(&self, pos: MapPoint, player: PlayerId) -> bool;
    fn ships(&self, player: PlayerId) -> Vec<ShipInfo>;
    fn sea_attackers_at_sea(&self, player: PlayerId, sea: SeaId) -> u32;
    /// Subset of `seas` from which `target` can be reached by ship
    fn filtered_seas_for_attack(&self, target: MapPoint, seas: &[SeaId], player: PlayerId)
        -> Vec<SeaId>;
    fn soldiers_for_sea_attack(&self, player: PlayerId, target: MapPoint) -> AttackForce;
    fn is_exploration_direction_possible(&self, ship: ShipId, dir: ShipDirection) -> bool;

    // === PLAYER ===
    fn inventory(&self, player: PlayerId) -> Inventory;
    fn military_settings(&self, player: PlayerId) -> MilitarySettings;
    fn tool_settings(&self, player: PlayerId) -> ToolSettings;
    fn game_settings(&self) -> GameSettings;
    fn can_build(&self, player: PlayerId, kind: BuildingType) -> bool;

    // === COMMANDS & NOTIFICATIONS ===
    /// Issue a command. The result only says whether it was accepted locally.
    fn issue(&mut self, player: PlayerId, command: Command) -> bool;
    fn notifications(&self) -> &NotificationBus;
}
