//! Invalidation events broadcast to observers.
//!
//! The engine clears its own caches on every known mutation; hosts that
//! maintain derived state (badge counts, prefetched lists) can subscribe
//! to hear about the same mutations over a plain mpsc channel.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// A mutation the engine reacted to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidationEvent {
    /// A training event was applied or undone
    ProfileTrained,
    /// Engine settings changed
    SettingsChanged,
    /// The ANN index was rebuilt
    IndexRebuilt,
    /// The host signaled an external store mutation
    StoreMutated,
}

/// Fan-out of invalidation events to registered observers.
///
/// Disconnected receivers are dropped lazily on the next broadcast.
#[derive(Default)]
pub struct InvalidationBroadcaster {
    observers: Mutex<Vec<Sender<InvalidationEvent>>>,
}

impl InvalidationBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; events arrive on the returned channel
    pub fn subscribe(&self) -> Receiver<InvalidationEvent> {
        let (tx, rx) = channel();
        self.observers.lock().unwrap().push(tx);
        rx
    }

    /// Send an event to every live observer
    pub fn broadcast(&self, event: InvalidationEvent) {
        let mut observers = self.observers.lock().unwrap();
        observers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_broadcast() {
        let broadcaster = InvalidationBroadcaster::new();
        let rx = broadcaster.subscribe();
        broadcaster.broadcast(InvalidationEvent::ProfileTrained);
        assert_eq!(rx.recv().unwrap(), InvalidationEvent::ProfileTrained);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let broadcaster = InvalidationBroadcaster::new();
        let rx = broadcaster.subscribe();
        drop(rx);
        broadcaster.broadcast(InvalidationEvent::IndexRebuilt);
        assert!(broadcaster.observers.lock().unwrap().is_empty());
    }
}
