use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::product::{ProductId, ProductRef};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPageEntry {
    pub path: String,
    pub title: String,
    pub visited_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub label: String,
    pub path: String,
    pub is_active: bool,
}

impl Breadcrumb {
    pub fn new(label: impl Into<String>, path: impl Into<String>, is_active: bool) -> Self {
        Self { label: label.into(), path: path.into(), is_active }
    }
}

pub type AppliedFilters = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSnapshot {
    pub term: String,
    pub results: Vec<ProductRef>,
    pub applied_filters: AppliedFilters,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFlags {
    pub sidebar_open: bool,
    pub compact_view: bool,
    pub show_recently_viewed: bool,
}

/// Read-only view of history state handed to the aggregation and scoring paths.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub visited_products: Vec<ProductId>,
    pub recent_pages: Vec<RecentPageEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub last_search: SearchSnapshot,
}

impl HistorySnapshot {
    pub fn has_visited(&self, id: &ProductId) -> bool {
        self.visited_products.iter().any(|visited| visited == id)
    }
}
