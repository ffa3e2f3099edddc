//! Internal events and the per-agent event queue
//!
//! World notifications addressed to the agent become [`Event`]s. The queue
//! is drained in arrival order, a bounded number per tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{BuildingType, PlayerId, ShipId};
use crate::map::point::{Direction, MapPoint};
use crate::world::notify::{BuildingNoteKind, ExpeditionNoteKind, Note, RoadNoteKind};
use crate::world::SubsurfaceResource;

/// What happened, with the payload the handler needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    BuildingConquered(BuildingType),
    MilitaryOccupied(BuildingType),
    BuildingDestroyed(BuildingType),
    BuildingLost(BuildingType),
    LostLand(BuildingType),
    NoMoreResourcesReachable(BuildingType),
    BuildingFinished(BuildingType),
    BorderChanged(BuildingType),
    LuaConstructionOrder { building: BuildingType, forced: bool },
    ExpeditionWaiting(Option<ShipId>),
    NewColonyFounded,
    ResourceFound(SubsurfaceResource),
    RoadConstructionComplete(Direction),
    RoadConstructionFailed(Direction),
    ShipBuilt(ShipId),
    TreeChopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub pos: MapPoint,
    pub kind: EventKind,
}

impl Event {
    pub fn new(pos: MapPoint, kind: EventKind) -> Self {
        Self { pos, kind }
    }

    /// Translate a note for `player`, dropping notes meant for others
    ///
    /// Node notes are not events; the agent consumes them directly.
    pub fn from_note(note: &Note, player: PlayerId) -> Option<Self> {
        let event = match *note {
            Note::Building { player: p, pos, kind, building } if p == player => {
                let kind = match kind {
                    BuildingNoteKind::Constructed => EventKind::BuildingFinished(building),
                    BuildingNoteKind::Destroyed => EventKind::BuildingDestroyed(building),
                    BuildingNoteKind::Captured => EventKind::BuildingConquered(building),
                    BuildingNoteKind::Occupied => EventKind::MilitaryOccupied(building),
                    BuildingNoteKind::Lost => EventKind::BuildingLost(building),
                    BuildingNoteKind::LostLand => EventKind::LostLand(building),
                    BuildingNoteKind::NoResources => EventKind::NoMoreResourcesReachable(building),
                    BuildingNoteKind::LuaOrder { forced } => {
                        EventKind::LuaConstructionOrder { building, forced }
                    }
                };
                Event::new(pos, kind)
            }
            Note::Expedition { player: p, pos, kind, ship } if p == player => match kind {
                ExpeditionNoteKind::Waiting => Event::new(pos, EventKind::ExpeditionWaiting(ship)),
                ExpeditionNoteKind::ColonyFounded => Event::new(pos, EventKind::NewColonyFounded),
            },
            Note::Resource { player: p, pos, resource } if p == player => {
                Event::new(pos, EventKind::ResourceFound(resource))
            }
            Note::Road { player: p, pos, kind, dir } if p == player => match kind {
                RoadNoteKind::Constructed => {
                    Event::new(pos, EventKind::RoadConstructionComplete(dir))
                }
                RoadNoteKind::ConstructionFailed => {
                    Event::new(pos, EventKind::RoadConstructionFailed(dir))
                }
            },
            Note::Ship { player: p, pos, ship } if p == player => {
                Event::new(pos, EventKind::ShipBuilt(ship))
            }
            _ => return None,
        };
        Some(event)
    }
}

/// FIFO of events waiting to be handled
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Take at most `quota` events; the rest waits for the next tick
    pub fn drain_quota(&mut self, quota: usize) -> Vec<Event> {
        let n = quota.min(self.events.len());
        self.events.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chopped(x: u16) -> Event {
        Event::new(MapPoint::new(x, 0), EventKind::TreeChopped)
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = EventQueue::new();
        for x in 0..3 {
            queue.push(chopped(x));
        }
        assert_eq!(queue.pop(), Some(chopped(0)));
        assert_eq!(queue.pop(), Some(chopped(1)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_quota_keeps_remaining_events() {
        let mut queue = EventQueue::new();
        for x in 0..15 {
            queue.push(chopped(x));
        }
        let first = queue.drain_quota(10);
        assert_eq!(first.len(), 10);
        assert_eq!(first[0], chopped(0));
        assert_eq!(queue.len(), 5);
        let rest = queue.drain_quota(10);
        assert_eq!(rest[0], chopped(10));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_notes_filtered_by_player() {
        let note = Note::Building {
            player: PlayerId(1),
            pos: MapPoint::new(4, 4),
            kind: BuildingNoteKind::Constructed,
            building: BuildingType::Woodcutter,
        };
        assert!(Event::from_note(&note, PlayerId(0)).is_none());
        let event = Event::from_note(&note, PlayerId(1)).unwrap();
        assert_eq!(event.kind, EventKind::BuildingFinished(BuildingType::Woodcutter));
    }

    #[test]
    fn test_road_note_translation() {
        let note = Note::Road {
            player: PlayerId(0),
            pos: MapPoint::new(2, 2),
            kind: RoadNoteKind::ConstructionFailed,
            dir: Direction::East,
        };
        let event = Event::from_note(&note, PlayerId(0)).unwrap();
        assert_eq!(event.kind, EventKind::RoadConstructionFailed(Direction::East));
        assert_eq!(event.pos, MapPoint::new(2, 2));
    }
}
