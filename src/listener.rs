use crate::engine::GameObjectId;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of listeners an emitter is heard by.
///
/// Shared between the tick loop and lifecycle callbacks that may run while a
/// tick is in progress. Every method takes the lock for the duration of one
/// read or write only; callers work on [`snapshot`](Self::snapshot)s and never
/// hold the lock while calling into the sound engine.
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    inner: Arc<Mutex<BTreeSet<GameObjectId>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listeners(listeners: impl IntoIterator<Item = GameObjectId>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(listeners.into_iter().collect())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<GameObjectId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns whether the listener was newly added.
    pub fn add(&self, listener: GameObjectId) -> bool {
        self.lock().insert(listener)
    }

    /// Returns whether the listener was present.
    pub fn remove(&self, listener: GameObjectId) -> bool {
        self.lock().remove(&listener)
    }

    pub fn replace(&self, listeners: impl IntoIterator<Item = GameObjectId>) {
        let listeners: BTreeSet<GameObjectId> = listeners.into_iter().collect();
        *self.lock() = listeners;
    }

    pub fn contains(&self, listener: GameObjectId) -> bool {
        self.lock().contains(&listener)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current members, in id order
    pub fn snapshot(&self) -> Vec<GameObjectId> {
        self.lock().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn add_remove_and_snapshot() {
        let set = ListenerSet::new();
        assert!(set.add(GameObjectId(3)));
        assert!(set.add(GameObjectId(1)));
        assert!(!set.add(GameObjectId(3)));
        assert_eq!(set.snapshot(), vec![GameObjectId(1), GameObjectId(3)]);

        assert!(set.remove(GameObjectId(3)));
        assert!(!set.remove(GameObjectId(3)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn clones_share_membership() {
        let set = ListenerSet::from_listeners([GameObjectId(1)]);
        let shared = set.clone();
        let handle = thread::spawn(move || {
            shared.remove(GameObjectId(1));
            shared.add(GameObjectId(2));
        });
        handle.join().unwrap();
        assert_eq!(set.snapshot(), vec![GameObjectId(2)]);
    }
}
