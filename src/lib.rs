//! Colony AI - autonomous player for hex-map settlement games

pub mod construction;
pub mod core;
pub mod events;
pub mod map;
pub mod military;
pub mod planner;
pub mod player;
pub mod resources;
pub mod roads;
pub mod world;

pub use crate::core::{AiConfig, AiError, AiLevel, Result};
pub use crate::player::AiPlayer;
pub use crate::world::{Command, GameWorld};
