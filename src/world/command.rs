//! Commands an AI player can issue to the world
//!
//! Commands carry intent only. Whether they worked is reported back
//! through notifications.

use serde::{Deserialize, Serialize};

use crate::core::types::{
    BuildingType, InventorySetting, MilitarySettings, ShipId, StockItem, ToolSettings,
    DISTRIBUTION_LEN,
};
use crate::map::point::{Direction, MapPoint};
use crate::world::ShipDirection;

/// Types of commands that can be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    SetBuildingSite { pos: MapPoint, kind: BuildingType },
    DestroyBuilding { pos: MapPoint },
    DestroyFlag { pos: MapPoint },
    DestroyRoad { flag: MapPoint, dir: Direction },
    /// Road from `start` following `route`. Must end at a flag.
    BuildRoad { start: MapPoint, route: Vec<Direction> },
    SetFlag { pos: MapPoint },
    SetProductionEnabled { pos: MapPoint, enabled: bool },
    SetCoinsAllowed { pos: MapPoint, enabled: bool },
    SetTroopLimit { pos: MapPoint, rank: u8, limit: u32 },
    ChangeReserve { pos: MapPoint, rank: u8, count: u32 },
    SetInventorySetting { pos: MapPoint, item: StockItem, setting: InventorySetting },
    ChangeDistribution([u8; DISTRIBUTION_LEN]),
    ChangeMilitary(MilitarySettings),
    ChangeTools(ToolSettings),
    Attack { target: MapPoint, soldiers: u32, strong_first: bool },
    SeaAttack { target: MapPoint, soldiers: u32, strong_first: bool },
    StartStopExpedition { pos: MapPoint, start: bool },
    SetShipYardMode { pos: MapPoint, ships: bool },
    FoundColony { ship: ShipId },
    TravelToNextSpot { ship: ShipId, dir: ShipDirection },
    CancelExpedition { ship: ShipId },
    Surrender,
    Chat { message: String },
}

impl Command {
    /// Convenience: place a building site
    pub fn build(kind: BuildingType, pos: MapPoint) -> Self {
        Command::SetBuildingSite { pos, kind }
    }

    /// Convenience: chat message to everyone
    pub fn chat(message: impl Into<String>) -> Self {
        Command::Chat { message: message.into() }
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, Command::Attack { .. } | Command::SeaAttack { .. })
    }
}
