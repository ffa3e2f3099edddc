//! Notification bus between the world and its observers
//!
//! Subscriptions are scoped: a [`Subscription`] owns its inbox and the bus
//! only keeps a weak handle, so dropping the subscription unsubscribes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::core::types::{BuildingType, PlayerId, ShipId};
use crate::map::point::{Direction, MapPoint};
use crate::world::SubsurfaceResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingNoteKind {
    Constructed,
    Destroyed,
    /// Conquered from an enemy
    Captured,
    /// A new military building got its first soldiers
    Occupied,
    Lost,
    LostLand,
    NoResources,
    /// Scripted construction order; `forced` places without checks
    LuaOrder { forced: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpeditionNoteKind {
    Waiting,
    ColonyFounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadNoteKind {
    Constructed,
    ConstructionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeNoteKind {
    /// Building quality changed
    Bq,
    Owner,
}

/// Something that happened in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Note {
    Building { player: PlayerId, pos: MapPoint, kind: BuildingNoteKind, building: BuildingType },
    Expedition { player: PlayerId, pos: MapPoint, kind: ExpeditionNoteKind, ship: Option<ShipId> },
    Resource { player: PlayerId, pos: MapPoint, resource: SubsurfaceResource },
    /// `pos` is the start flag and `dir` the first step of the road
    Road { player: PlayerId, pos: MapPoint, kind: RoadNoteKind, dir: Direction },
    Ship { player: PlayerId, pos: MapPoint, ship: ShipId },
    Node { pos: MapPoint, kind: NodeNoteKind },
}

type Inbox = RefCell<VecDeque<Note>>;

/// Single-threaded publish/subscribe channel for [`Note`]s
#[derive(Debug, Default)]
pub struct NotificationBus {
    subscribers: RefCell<Vec<Weak<Inbox>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Rc::downgrade(&inbox));
        Subscription { inbox }
    }

    /// Deliver `note` to every live subscriber, forgetting dropped ones
    pub fn publish(&self, note: Note) {
        self.subscribers.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(inbox) => {
                inbox.borrow_mut().push_back(note);
                true
            }
            None => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// Receiving end of a bus subscription
#[derive(Debug)]
pub struct Subscription {
    inbox: Rc<Inbox>,
}

impl Subscription {
    /// Take all pending notes in arrival order
    pub fn drain(&self) -> Vec<Note> {
        self.inbox.borrow_mut().drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(x: u16) -> Note {
        Note::Node { pos: MapPoint::new(x, 0), kind: NodeNoteKind::Bq }
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = NotificationBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(note(1));
        bus.publish(note(2));
        assert_eq!(a.drain(), vec![note(1), note(2)]);
        assert_eq!(b.pending(), 2);
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let bus = NotificationBus::new();
        let kept = bus.subscribe();
        {
            let _gone = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(note(3));
        assert_eq!(bus.subscribers.borrow().len(), 1);
        assert_eq!(kept.pending(), 1);
    }
}
