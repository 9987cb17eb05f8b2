//! Session history store.
//!
//! Owns the bounded browsing state for one session: a most-recently-used list of visited
//! products, a most-recently-used list of visited pages, the breadcrumb trail, the last
//! search and a handful of UI toggles. Every mutation writes the persisted subset through
//! to a [`BlobStore`]; write failures are logged and the in-memory state stays
//! authoritative for the rest of the session.
//!
//! The store is a plain single-owner value. Mutators take `&mut self`, so a single-threaded
//! host needs no locking. Hosts that share sessions across threads must go through
//! [`crate::session::SessionRegistry`], which serializes writers per session key.

mod clock;
pub mod persisted;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::domain::history::{
    AppliedFilters, Breadcrumb, HistorySnapshot, RecentPageEntry, SearchSnapshot, UiFlags,
};
use crate::domain::product::{ProductId, ProductRef};
use crate::errors::StorageError;
use crate::storage::BlobStore;

pub use clock::{Clock, ManualClock, SystemClock};
pub use persisted::{DecodeError, PersistedState, SCHEMA_VERSION};

pub const MAX_VISITED: usize = 20;
pub const MAX_PAGES: usize = 10;
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_GC_MAX_AGE_MS: i64 = 30 * DAY_MS;
pub const DEFAULT_STORAGE_KEY: &str = "browsetrail:session-history";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryLimits {
    pub max_visited: usize,
    pub max_pages: usize,
    pub gc_max_age_ms: i64,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_visited: MAX_VISITED,
            max_pages: MAX_PAGES,
            gc_max_age_ms: DEFAULT_GC_MAX_AGE_MS,
        }
    }
}

/// Change notification delivered to subscribers after a mutation is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEvent {
    Loaded,
    ProductVisited(ProductId),
    PageVisited { path: String },
    BreadcrumbsChanged,
    SearchChanged,
    UiFlagsChanged,
    GarbageCollected { evicted: usize },
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&HistoryEvent) + Send + Sync>;

/// Why a stored payload was not used during [`HistoryStore::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    ReadFailed(String),
    Undecodable(DecodeError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was stored under the key.
    Missing,
    Restored { evicted_pages: usize },
    Discarded(DiscardReason),
}

#[derive(Clone, Debug, Default, PartialEq)]
struct HistoryState {
    visited_products: Vec<ProductId>,
    recent_pages: Vec<RecentPageEntry>,
    breadcrumbs: Vec<Breadcrumb>,
    last_search: SearchSnapshot,
    ui_flags: UiFlags,
}

impl HistoryState {
    fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            visited_products: persisted.visited_products,
            recent_pages: persisted.recent_pages,
            breadcrumbs: Vec::new(),
            last_search: SearchSnapshot {
                term: persisted.last_search_term,
                results: Vec::new(),
                applied_filters: persisted.last_search_filters,
            },
            ui_flags: persisted.ui_flags,
        }
    }

    fn to_persisted(&self) -> PersistedState {
        PersistedState {
            visited_products: self.visited_products.clone(),
            recent_pages: self.recent_pages.clone(),
            last_search_term: self.last_search.term.clone(),
            last_search_filters: self.last_search.applied_filters.clone(),
            ui_flags: self.ui_flags,
        }
    }
}

pub struct HistoryStore {
    state: HistoryState,
    limits: HistoryLimits,
    storage: Box<dyn BlobStore>,
    storage_key: String,
    clock: Arc<dyn Clock>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("state", &self.state)
            .field("limits", &self.limits)
            .field("storage_key", &self.storage_key)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl HistoryStore {
    /// Creates an empty store. Call [`HistoryStore::load`] to rehydrate persisted state.
    pub fn new(storage: impl BlobStore + 'static) -> Self {
        Self {
            state: HistoryState::default(),
            limits: HistoryLimits::default(),
            storage: Box::new(storage),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            clock: Arc::new(SystemClock),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn with_limits(mut self, limits: HistoryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a store and immediately rehydrates it.
    pub fn open(storage: impl BlobStore + 'static) -> Self {
        let mut store = Self::new(storage);
        store.load();
        store
    }

    /// Replaces in-memory state with what is persisted under the storage key, then runs
    /// garbage collection. Never fails: unreadable, malformed or version-mismatched payloads
    /// leave the store in its empty initial state.
    pub fn load(&mut self) -> LoadOutcome {
        self.state = HistoryState::default();

        let outcome = match self.storage.get(&self.storage_key) {
            Ok(None) => {
                debug!(
                    event_name = "history.load.missing",
                    storage_key = %self.storage_key,
                    "no persisted history; starting empty"
                );
                LoadOutcome::Missing
            }
            Ok(Some(bytes)) => match persisted::decode(&bytes, &self.limits) {
                Ok(persisted) => {
                    self.state = HistoryState::from_persisted(persisted);
                    LoadOutcome::Restored { evicted_pages: 0 }
                }
                Err(error) => {
                    warn!(
                        event_name = "history.load.discarded",
                        storage_key = %self.storage_key,
                        error = %error,
                        "persisted history discarded; starting empty"
                    );
                    LoadOutcome::Discarded(DiscardReason::Undecodable(error))
                }
            },
            Err(error) => {
                warn!(
                    event_name = "history.load.read_failed",
                    storage_key = %self.storage_key,
                    error = %error,
                    "persisted history unreadable; starting empty"
                );
                LoadOutcome::Discarded(DiscardReason::ReadFailed(error.to_string()))
            }
        };

        self.notify(&HistoryEvent::Loaded);
        let evicted = self.garbage_collect(Some(self.clock.now_ms()), self.limits.gc_max_age_ms);

        match outcome {
            LoadOutcome::Restored { .. } => LoadOutcome::Restored { evicted_pages: evicted },
            other => other,
        }
    }

    /// Writes the persisted subset to storage.
    pub fn save(&self) -> Result<(), StorageError> {
        let bytes = persisted::encode(&self.state.to_persisted())
            .map_err(|error| StorageError::Backend(format!("history encode failed: {error}")))?;
        self.storage.set(&self.storage_key, &bytes)
    }

    pub fn record_product_visit(&mut self, product_id: impl Into<ProductId>) {
        let product_id = product_id.into();
        self.state.visited_products.retain(|id| id != &product_id);
        self.state.visited_products.insert(0, product_id.clone());
        self.state.visited_products.truncate(self.limits.max_visited);
        self.commit(HistoryEvent::ProductVisited(product_id));
    }

    pub fn record_page_visit(&mut self, path: impl Into<String>, title: impl Into<String>) {
        let path = path.into();
        self.state.recent_pages.retain(|page| page.path != path);
        self.state.recent_pages.insert(
            0,
            RecentPageEntry {
                path: path.clone(),
                title: title.into(),
                visited_at_ms: self.clock.now_ms(),
            },
        );
        self.state.recent_pages.truncate(self.limits.max_pages);
        self.commit(HistoryEvent::PageVisited { path });
    }

    pub fn set_breadcrumbs(&mut self, breadcrumbs: Vec<Breadcrumb>) {
        self.state.breadcrumbs = breadcrumbs;
        self.commit(HistoryEvent::BreadcrumbsChanged);
    }

    pub fn clear_breadcrumbs(&mut self) {
        self.set_breadcrumbs(Vec::new());
    }

    pub fn save_search(
        &mut self,
        term: impl Into<String>,
        results: Vec<ProductRef>,
        applied_filters: AppliedFilters,
    ) {
        self.state.last_search = SearchSnapshot { term: term.into(), results, applied_filters };
        self.commit(HistoryEvent::SearchChanged);
    }

    pub fn clear_search(&mut self) {
        self.state.last_search = SearchSnapshot::default();
        self.commit(HistoryEvent::SearchChanged);
    }

    pub fn set_ui_flags(&mut self, flags: UiFlags) {
        self.state.ui_flags = flags;
        self.commit(HistoryEvent::UiFlagsChanged);
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.state.ui_flags.sidebar_open = !self.state.ui_flags.sidebar_open;
        self.commit(HistoryEvent::UiFlagsChanged);
        self.state.ui_flags.sidebar_open
    }

    pub fn reset(&mut self) {
        self.state = HistoryState::default();
        self.commit(HistoryEvent::Reset);
    }

    /// Drops recent pages older than `max_age_ms` relative to `now_ms` and returns how many
    /// were removed. A missing or negative `now_ms` skips eviction entirely.
    pub fn garbage_collect(&mut self, now_ms: Option<i64>, max_age_ms: i64) -> usize {
        let Some(now_ms) = now_ms.filter(|now| *now >= 0) else {
            debug!(event_name = "history.gc.skipped", "gc skipped without a valid timestamp");
            return 0;
        };

        let cutoff = now_ms.saturating_sub(max_age_ms);
        let before = self.state.recent_pages.len();
        self.state.recent_pages.retain(|page| page.visited_at_ms >= cutoff);
        let evicted = before - self.state.recent_pages.len();

        if evicted > 0 {
            info!(
                event_name = "history.gc.evicted",
                storage_key = %self.storage_key,
                evicted,
                "evicted stale recent pages"
            );
            self.commit(HistoryEvent::GarbageCollected { evicted });
        }
        evicted
    }

    /// Garbage-collects against the store's clock and configured max age.
    pub fn garbage_collect_now(&mut self) -> usize {
        let now_ms = self.clock.now_ms();
        self.garbage_collect(Some(now_ms), self.limits.gc_max_age_ms)
    }

    pub fn subscribe(
        &mut self,
        observer: impl Fn(&HistoryEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        before != self.observers.len()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            visited_products: self.state.visited_products.clone(),
            recent_pages: self.state.recent_pages.clone(),
            breadcrumbs: self.state.breadcrumbs.clone(),
            last_search: self.state.last_search.clone(),
        }
    }

    /// Visited products resolved against the catalog, most recent first. Ids the catalog no
    /// longer carries are skipped.
    pub fn recently_viewed<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
        limit: usize,
    ) -> Vec<ProductRef> {
        self.state
            .visited_products
            .iter()
            .filter_map(|id| catalog.find(id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn visited_products(&self) -> &[ProductId] {
        &self.state.visited_products
    }

    pub fn recent_pages(&self) -> &[RecentPageEntry] {
        &self.state.recent_pages
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.state.breadcrumbs
    }

    pub fn last_search(&self) -> &SearchSnapshot {
        &self.state.last_search
    }

    pub fn ui_flags(&self) -> UiFlags {
        self.state.ui_flags
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn commit(&mut self, event: HistoryEvent) {
        self.persist();
        self.notify(&event);
    }

    fn persist(&self) {
        if let Err(error) = self.save() {
            warn!(
                event_name = "history.persist.write_failed",
                storage_key = %self.storage_key,
                error = %error,
                "history write-through failed; keeping in-memory state"
            );
        }
    }

    fn notify(&self, event: &HistoryEvent) {
        for (_, observer) in &self.observers {
            observer(event);
        }
    }
}
