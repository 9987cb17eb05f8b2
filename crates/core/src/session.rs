//! Per-session history stores for multi-threaded hosts.
//!
//! [`HistoryStore`] has no internal locking. The registry wraps each session's store in
//! its own mutex so there is exactly one writer per session key at a time; sessions never
//! block each other beyond the brief registry lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once, PoisonError, RwLock};

use tracing::debug;

use crate::domain::history::HistorySnapshot;
use crate::history::HistoryStore;

type StoreFactory = Box<dyn Fn(&str) -> HistoryStore + Send + Sync>;

struct SessionSlot {
    store: Arc<Mutex<HistoryStore>>,
    loaded: Once,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    factory: StoreFactory,
}

impl SessionRegistry {
    /// `factory` builds an unloaded store for a session key; the registry loads it on first use.
    pub fn new(factory: impl Fn(&str) -> HistoryStore + Send + Sync + 'static) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), factory: Box::new(factory) }
    }

    /// Returns the store for `key`, creating and loading it on first access.
    ///
    /// The registry lock only covers the map insert. Loading runs under the session's own
    /// mutex, so a slow backend read stalls callers of that key alone.
    pub fn session(&self, key: &str) -> Arc<Mutex<HistoryStore>> {
        let slot = self.slot(key);
        slot.loaded.call_once(|| {
            let mut store = slot.store.lock().unwrap_or_else(PoisonError::into_inner);
            let outcome = store.load();
            debug!(
                event_name = "session.registry.opened",
                session_key = key,
                outcome = ?outcome,
                "history session opened"
            );
        });
        slot.store.clone()
    }

    fn slot(&self, key: &str) -> Arc<SessionSlot> {
        if let Some(existing) =
            self.sessions.read().unwrap_or_else(PoisonError::into_inner).get(key)
        {
            return existing.clone();
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(key.to_owned())
            .or_insert_with(|| {
                Arc::new(SessionSlot {
                    store: Arc::new(Mutex::new((self.factory)(key))),
                    loaded: Once::new(),
                })
            })
            .clone()
    }

    /// Runs `f` while holding the session's writer lock.
    pub fn with_session<R>(&self, key: &str, f: impl FnOnce(&mut HistoryStore) -> R) -> R {
        let session = self.session(key);
        let mut store = session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }

    /// Copies the session state out so read paths run without holding the lock.
    pub fn snapshot(&self, key: &str) -> HistorySnapshot {
        self.with_session(key, |store| store.snapshot())
    }

    /// Drops the in-memory store for `key`. Persisted state is left untouched.
    pub fn evict(&self, key: &str) -> bool {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
