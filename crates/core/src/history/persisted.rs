//! Versioned wire format for the persisted subset of history state.
//!
//! Payloads are JSON envelopes `{"version": N, "state": {...}}`. Only the current schema
//! version is accepted; anything else is discarded and the store starts empty.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::history::{AppliedFilters, RecentPageEntry, UiFlags};
use crate::domain::product::ProductId;
use crate::history::HistoryLimits;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub visited_products: Vec<ProductId>,
    pub recent_pages: Vec<RecentPageEntry>,
    pub last_search_term: String,
    pub last_search_filters: AppliedFilters,
    pub ui_flags: UiFlags,
}

#[derive(Debug, Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    state: &'a PersistedState,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    version: u32,
    state: Value,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not a valid history envelope: {0}")]
    Malformed(String),
    #[error("schema version mismatch (expected {expected}, found {found})")]
    VersionMismatch { expected: u32, found: u32 },
}

pub fn encode(state: &PersistedState) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnvelopeRef { version: SCHEMA_VERSION, state })
}

pub fn decode(bytes: &[u8], limits: &HistoryLimits) -> Result<PersistedState, DecodeError> {
    let envelope: RawEnvelope =
        serde_json::from_slice(bytes).map_err(|error| DecodeError::Malformed(error.to_string()))?;
    let mut state = migrate(envelope.version, envelope.state)?;
    normalize(&mut state, limits);
    Ok(state)
}

fn migrate(version: u32, state: Value) -> Result<PersistedState, DecodeError> {
    match version {
        SCHEMA_VERSION => serde_json::from_value(state)
            .map_err(|error| DecodeError::Malformed(error.to_string())),
        found => Err(DecodeError::VersionMismatch { expected: SCHEMA_VERSION, found }),
    }
}

/// Re-establishes list invariants on rehydrated data (dedup, bounds).
fn normalize(state: &mut PersistedState, limits: &HistoryLimits) {
    let mut seen_products = HashSet::new();
    state.visited_products.retain(|id| seen_products.insert(id.clone()));
    state.visited_products.truncate(limits.max_visited);

    let mut seen_paths = HashSet::new();
    state.recent_pages.retain(|page| seen_paths.insert(page.path.clone()));
    state.recent_pages.truncate(limits.max_pages);
}
