//! Collision state tracking between observers and triggers

use std::collections::BTreeSet;

/// Player identifier, chosen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

/// Camera identifier, chosen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub u32);

/// What is colliding with a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observer {
    Player(PlayerId),
    Camera(CameraId),
}

impl Observer {
    pub fn kind(&self) -> ObserverKind {
        match self {
            Observer::Player(_) => ObserverKind::Player,
            Observer::Camera(_) => ObserverKind::Camera,
        }
    }
}

/// The observer type a trigger reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverKind {
    Player,
    Camera,
}

/// Transition of one (observer, trigger) pair between two ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEvent {
    /// Not colliding last tick, colliding now
    Started,
    /// Colliding on both ticks
    Again,
    /// Colliding last tick, not anymore
    Finished,
}

/// Compare the triggers an observer collided with last tick against this
/// tick's set. Events come out in trigger id order, finished ones included.
pub fn diff_collisions(
    previous: &BTreeSet<u32>,
    current: &BTreeSet<u32>,
) -> Vec<(u32, CollisionEvent)> {
    let mut events = Vec::with_capacity(previous.len() + current.len());
    for id in previous.difference(current) {
        events.push((*id, CollisionEvent::Finished));
    }
    for id in current {
        if previous.contains(id) {
            events.push((*id, CollisionEvent::Again));
        } else {
            events.push((*id, CollisionEvent::Started));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_reports_each_transition_once() {
        let previous = BTreeSet::from([1, 2]);
        let current = BTreeSet::from([2, 3]);

        let mut events = diff_collisions(&previous, &current);
        events.sort_by_key(|(id, _)| *id);

        assert_eq!(
            events,
            vec![
                (1, CollisionEvent::Finished),
                (2, CollisionEvent::Again),
                (3, CollisionEvent::Started),
            ]
        );
    }

    #[test]
    fn test_diff_of_empty_sets() {
        let empty = BTreeSet::new();
        assert!(diff_collisions(&empty, &empty).is_empty());
        assert_eq!(
            diff_collisions(&BTreeSet::from([4]), &empty),
            vec![(4, CollisionEvent::Finished)]
        );
    }

    #[test]
    fn test_observer_kind() {
        assert_eq!(Observer::Camera(CameraId(1)).kind(), ObserverKind::Camera);
        assert_eq!(Observer::Player(PlayerId(1)).kind(), ObserverKind::Player);
    }
}
