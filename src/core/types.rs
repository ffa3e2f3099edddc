//! Core type definitions used throughout the codebase

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Game frame counter (simulation time unit)
pub type Gf = u32;

/// Identifier of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn index(self) -> u32 {
        self.0 as u32
    }
}

/// Opaque handle of a ship owned by some player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipId(pub u32);

/// Identifier of a connected body of water
pub type SeaId = u16;

/// Footprint a building needs on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingSize {
    Hut,
    House,
    Castle,
    Mine,
    Harbor,
}

/// Ordered construction capability of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum BuildingQuality {
    #[default]
    Nothing,
    Flag,
    Hut,
    House,
    Castle,
    Mine,
    Harbor,
}

impl BuildingQuality {
    /// Whether a node with this quality can hold a building of `size`
    ///
    /// Mines need mine quality, harbors need harbor quality, everything
    /// else fits on any equal or larger surface quality. Harbor spots also
    /// take any surface building.
    pub fn permits(self, size: BuildingSize) -> bool {
        use BuildingQuality as Q;
        match size {
            BuildingSize::Mine => self == Q::Mine,
            BuildingSize::Harbor => self == Q::Harbor,
            BuildingSize::Hut => matches!(self, Q::Hut | Q::House | Q::Castle | Q::Harbor),
            BuildingSize::House => matches!(self, Q::House | Q::Castle | Q::Harbor),
            BuildingSize::Castle => matches!(self, Q::Castle | Q::Harbor),
        }
    }

    /// Anything at all can be placed, a flag included
    pub fn buildable(self) -> bool {
        self != BuildingQuality::Nothing
    }
}

/// Every building kind the agent knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingType {
    Headquarters,
    Barracks,
    Guardhouse,
    Watchtower,
    Fortress,
    GraniteMine,
    CoalMine,
    IronMine,
    GoldMine,
    LookoutTower,
    Catapult,
    Woodcutter,
    Fishery,
    Quarry,
    Forester,
    Slaughterhouse,
    Hunter,
    Brewery,
    Armory,
    Metalworks,
    Ironsmelter,
    Charburner,
    PigFarm,
    Storehouse,
    Mill,
    Bakery,
    Sawmill,
    Mint,
    Well,
    Shipyard,
    Farm,
    DonkeyBreeder,
    HarborBuilding,
}

impl BuildingType {
    pub const ALL: [BuildingType; 33] = [
        BuildingType::Headquarters,
        BuildingType::Barracks,
        BuildingType::Guardhouse,
        BuildingType::Watchtower,
        BuildingType::Fortress,
        BuildingType::GraniteMine,
        BuildingType::CoalMine,
        BuildingType::IronMine,
        BuildingType::GoldMine,
        BuildingType::LookoutTower,
        BuildingType::Catapult,
        BuildingType::Woodcutter,
        BuildingType::Fishery,
        BuildingType::Quarry,
        BuildingType::Forester,
        BuildingType::Slaughterhouse,
        BuildingType::Hunter,
        BuildingType::Brewery,
        BuildingType::Armory,
        BuildingType::Metalworks,
        BuildingType::Ironsmelter,
        BuildingType::Charburner,
        BuildingType::PigFarm,
        BuildingType::Storehouse,
        BuildingType::Mill,
        BuildingType::Bakery,
        BuildingType::Sawmill,
        BuildingType::Mint,
        BuildingType::Well,
        BuildingType::Shipyard,
        BuildingType::Farm,
        BuildingType::DonkeyBreeder,
        BuildingType::HarborBuilding,
    ];

    /// Military types from smallest to biggest
    pub const MILITARY: [BuildingType; 4] = [
        BuildingType::Barracks,
        BuildingType::Guardhouse,
        BuildingType::Watchtower,
        BuildingType::Fortress,
    ];

    pub fn size(self) -> BuildingSize {
        use BuildingType::*;
        match self {
            GraniteMine | CoalMine | IronMine | GoldMine => BuildingSize::Mine,
            HarborBuilding => BuildingSize::Harbor,
            Headquarters | Fortress | PigFarm | Farm | DonkeyBreeder | Charburner => {
                BuildingSize::Castle
            }
            Barracks | Guardhouse | LookoutTower | Woodcutter | Fishery | Quarry | Forester
            | Hunter | Well | Catapult => BuildingSize::Hut,
            _ => BuildingSize::House,
        }
    }

    pub fn is_military(self) -> bool {
        Self::MILITARY.contains(&self)
    }

    pub fn is_warehouse(self) -> bool {
        matches!(
            self,
            BuildingType::Headquarters | BuildingType::Storehouse | BuildingType::HarborBuilding
        )
    }

    pub fn is_mine(self) -> bool {
        self.size() == BuildingSize::Mine
    }

    /// Soldier capacity of a military building
    pub fn max_soldiers(self) -> u32 {
        match self {
            BuildingType::Barracks => 2,
            BuildingType::Guardhouse => 3,
            BuildingType::Watchtower => 6,
            BuildingType::Fortress => 9,
            _ => 0,
        }
    }

    /// Worker this building needs to operate
    pub fn worker(self) -> Option<Job> {
        use BuildingType::*;
        let job = match self {
            Woodcutter => Job::Woodcutter,
            Fishery => Job::Fisher,
            Quarry => Job::Stonemason,
            Forester => Job::Forester,
            Slaughterhouse => Job::Butcher,
            Hunter => Job::Huntsman,
            Brewery => Job::Brewer,
            Armory => Job::Armorer,
            Metalworks => Job::Metalworker,
            Ironsmelter => Job::IronFounder,
            Charburner => Job::CharBurner,
            PigFarm => Job::PigBreeder,
            Mill => Job::Miller,
            Bakery => Job::Baker,
            Sawmill => Job::Carpenter,
            Mint => Job::Minter,
            Well => Job::Helper,
            Shipyard => Job::Shipwright,
            Farm => Job::Farmer,
            DonkeyBreeder => Job::DonkeyBreeder,
            GraniteMine | CoalMine | IronMine | GoldMine => Job::Miner,
            _ => return None,
        };
        Some(job)
    }
}

/// Frontier-distance bucket of a military building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrontierDistance {
    /// Interior, no enemy nearby
    Far,
    Mid,
    /// Near a harbor that enemies could land at
    Harbor,
    /// Directly at an enemy border
    Near,
}

/// Goods stored in warehouses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoodType {
    Beer,
    Tongs,
    Hammer,
    Axe,
    Saw,
    PickAxe,
    Shovel,
    Crucible,
    RodAndLine,
    Scythe,
    Cleaver,
    Rollingpin,
    Bow,
    Boards,
    Stones,
    Wood,
    Gold,
    Coins,
    IronOre,
    Coal,
    Iron,
    Grain,
    Flour,
    Bread,
    Fish,
    Meat,
    Ham,
    Water,
    Sword,
    Shield,
    Boat,
}

/// Tools in priority-setting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Tongs,
    Hammer,
    Axe,
    Saw,
    PickAxe,
    Shovel,
    Crucible,
    RodAndLine,
    Scythe,
    Cleaver,
    Rollingpin,
    Bow,
}

impl Tool {
    pub const ALL: [Tool; 12] = [
        Tool::Tongs,
        Tool::Hammer,
        Tool::Axe,
        Tool::Saw,
        Tool::PickAxe,
        Tool::Shovel,
        Tool::Crucible,
        Tool::RodAndLine,
        Tool::Scythe,
        Tool::Cleaver,
        Tool::Rollingpin,
        Tool::Bow,
    ];

    pub fn good(self) -> GoodType {
        match self {
            Tool::Tongs => GoodType::Tongs,
            Tool::Hammer => GoodType::Hammer,
            Tool::Axe => GoodType::Axe,
            Tool::Saw => GoodType::Saw,
            Tool::PickAxe => GoodType::PickAxe,
            Tool::Shovel => GoodType::Shovel,
            Tool::Crucible => GoodType::Crucible,
            Tool::RodAndLine => GoodType::RodAndLine,
            Tool::Scythe => GoodType::Scythe,
            Tool::Cleaver => GoodType::Cleaver,
            Tool::Rollingpin => GoodType::Rollingpin,
            Tool::Bow => GoodType::Bow,
        }
    }
}

/// People stored in warehouses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Job {
    Helper,
    Woodcutter,
    Fisher,
    Forester,
    Carpenter,
    Stonemason,
    Huntsman,
    Farmer,
    Miller,
    Baker,
    Butcher,
    Miner,
    Brewer,
    PigBreeder,
    DonkeyBreeder,
    IronFounder,
    Minter,
    Metalworker,
    Armorer,
    Builder,
    Planer,
    Geologist,
    Scout,
    Shipwright,
    CharBurner,
    Private,
    PrivateFirstClass,
    Sergeant,
    Officer,
    General,
}

impl Job {
    /// Soldier ranks, lowest first
    pub const SOLDIERS: [Job; 5] = [
        Job::Private,
        Job::PrivateFirstClass,
        Job::Sergeant,
        Job::Officer,
        Job::General,
    ];

    /// Tool a helper needs to be trained for this job
    pub fn tool(self) -> Option<Tool> {
        let tool = match self {
            Job::Woodcutter => Tool::Axe,
            Job::Fisher => Tool::RodAndLine,
            Job::Forester | Job::Planer | Job::CharBurner => Tool::Shovel,
            Job::Carpenter => Tool::Saw,
            Job::Stonemason | Job::Miner => Tool::PickAxe,
            Job::Huntsman => Tool::Bow,
            Job::Farmer => Tool::Scythe,
            Job::Baker => Tool::Rollingpin,
            Job::Butcher => Tool::Cleaver,
            Job::IronFounder | Job::Minter => Tool::Crucible,
            Job::Metalworker => Tool::Tongs,
            Job::Armorer | Job::Builder | Job::Geologist | Job::Shipwright => Tool::Hammer,
            _ => return None,
        };
        Some(tool)
    }

    pub fn is_soldier(self) -> bool {
        Self::SOLDIERS.contains(&self)
    }
}

/// Goods and people held by a player or a single warehouse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub goods: AHashMap<GoodType, u32>,
    pub people: AHashMap<Job, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn good(&self, good: GoodType) -> u32 {
        self.goods.get(&good).copied().unwrap_or(0)
    }

    pub fn people(&self, job: Job) -> u32 {
        self.people.get(&job).copied().unwrap_or(0)
    }

    pub fn add_good(&mut self, good: GoodType, count: u32) {
        *self.goods.entry(good).or_insert(0) += count;
    }

    pub fn add_people(&mut self, job: Job, count: u32) {
        *self.people.entry(job).or_insert(0) += count;
    }

    pub fn soldiers(&self) -> u32 {
        Job::SOLDIERS.iter().map(|&rank| self.people(rank)).sum()
    }

    /// Adds another inventory into this one
    pub fn merge(&mut self, other: &Inventory) {
        for (&good, &count) in &other.goods {
            self.add_good(good, count);
        }
        for (&job, &count) in &other.people {
            self.add_people(job, count);
        }
    }
}

/// Number of distribution entries sent with a distribution command
pub const DISTRIBUTION_LEN: usize = 23;
/// Boards to metalworks
pub const DISTRIBUTION_BOARDS_METALWORKS: usize = 17;
/// Boards to shipyard
pub const DISTRIBUTION_BOARDS_SHIPYARD: usize = 18;

/// Per-slot maximum of the military settings
pub const MILITARY_SETTINGS_SCALE: [u8; 8] = [10, 5, 5, 5, 8, 8, 8, 8];

/// Player-wide military behaviour
///
/// Slots 0..4 tune recruiting, defence and attack strength. Slots 4..8 set
/// the occupation level of far, mid, harbor and near buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitarySettings(pub [u8; 8]);

impl Default for MilitarySettings {
    fn default() -> Self {
        Self(MILITARY_SETTINGS_SCALE)
    }
}

/// Tool production priorities, one slot per [`Tool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolSettings(pub [u8; 12]);

/// Warehouse handling of one good or job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventorySetting {
    /// Don't accept deliveries
    pub stop: bool,
    /// Actively gather from other warehouses
    pub collect: bool,
    /// Send stock away
    pub send: bool,
}

impl InventorySetting {
    pub const NONE: InventorySetting =
        InventorySetting { stop: false, collect: false, send: false };
    pub const STOP: InventorySetting = InventorySetting { stop: true, collect: false, send: false };
    pub const COLLECT: InventorySetting =
        InventorySetting { stop: false, collect: true, send: false };
}

/// Item a warehouse setting refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockItem {
    Good(GoodType),
    People(Job),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_permits_sizes() {
        assert!(BuildingQuality::Castle.permits(BuildingSize::Hut));
        assert!(BuildingQuality::Harbor.permits(BuildingSize::Castle));
        assert!(BuildingQuality::Harbor.permits(BuildingSize::Harbor));
        assert!(!BuildingQuality::Castle.permits(BuildingSize::Harbor));
        assert!(!BuildingQuality::Mine.permits(BuildingSize::Hut));
        assert!(BuildingQuality::Mine.permits(BuildingSize::Mine));
        assert!(!BuildingQuality::Hut.permits(BuildingSize::House));
        assert!(!BuildingQuality::Flag.permits(BuildingSize::Hut));
    }

    #[test]
    fn test_building_sizes() {
        assert_eq!(BuildingType::Farm.size(), BuildingSize::Castle);
        assert_eq!(BuildingType::GoldMine.size(), BuildingSize::Mine);
        assert_eq!(BuildingType::Sawmill.size(), BuildingSize::House);
        assert_eq!(BuildingType::Woodcutter.size(), BuildingSize::Hut);
    }

    #[test]
    fn test_military_classification() {
        assert!(BuildingType::Watchtower.is_military());
        assert!(!BuildingType::Catapult.is_military());
        assert!(BuildingType::HarborBuilding.is_warehouse());
        assert_eq!(BuildingType::Fortress.max_soldiers(), 9);
    }

    #[test]
    fn test_inventory_counts() {
        let mut inv = Inventory::new();
        inv.add_good(GoodType::Boards, 5);
        inv.add_good(GoodType::Boards, 3);
        inv.add_people(Job::Private, 4);
        inv.add_people(Job::General, 1);
        assert_eq!(inv.good(GoodType::Boards), 8);
        assert_eq!(inv.good(GoodType::Stones), 0);
        assert_eq!(inv.soldiers(), 5);
    }

    #[test]
    fn test_worker_tools() {
        assert_eq!(BuildingType::Woodcutter.worker().and_then(Job::tool), Some(Tool::Axe));
        assert_eq!(BuildingType::Well.worker().and_then(Job::tool), None);
    }
}
