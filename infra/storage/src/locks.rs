use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Per-identifier async locks. Entries live only while someone holds or awaits them.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<FxHashMap<String, Slot>>,
}

impl KeyedLocks {
    pub(crate) async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let slot = Arc::clone(self.slots.lock().entry(key.to_owned()).or_default());
        let interest = Interest { owner: self, key: key.to_owned(), slot };
        let guard = Arc::clone(&interest.slot).lock_owned().await;
        KeyGuard { _guard: guard, _interest: interest }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// A claim on a map entry, held by waiters and holders alike. Dropping the
/// last claim removes the entry, also when a waiting future is cancelled.
struct Interest<'a> {
    owner: &'a KeyedLocks,
    key: String,
    slot: Slot,
}

impl Drop for Interest<'_> {
    fn drop(&mut self) {
        let mut slots = self.owner.slots.lock();
        // Claims are cloned under the map lock, so the map's copy plus ours means the key is idle.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2)
        {
            slots.remove(&self.key);
        }
    }
}

pub(crate) struct KeyGuard<'a> {
    // Field order matters: the mutex is released before the claim is dropped.
    _guard: OwnedMutexGuard<()>,
    _interest: Interest<'a>,
}
