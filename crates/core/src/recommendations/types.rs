//! Types for the recommendation read paths

use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductId, ProductRef};

/// Tunables shared by the aggregator, score engine and report builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationSettings {
    /// Maximum related products returned (default: 4)
    pub related_limit: usize,
    /// Price similarity band as a fraction of the focal price (default: 0.2)
    pub price_band: f64,
    /// Rows in `top_viewed_products` (default: 5)
    pub top_products: usize,
    /// Rows in `top_visited_pages` (default: 5)
    pub top_pages: usize,
    /// Rows in `recommendations` (default: 10)
    pub max_recommendations: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        super::DEFAULT_SETTINGS
    }
}

/// Rule that put a product into the related-products list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Same category as the focal product and already visited
    VisitedSameCategory,
    /// Price within the similarity band
    SimilarPrice,
    /// Appeared in the last search results
    LastSearchResult,
    /// Matches one of the last search's applied filters
    MatchingFilter,
}

impl CandidateSource {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            CandidateSource::VisitedSameCategory => "More from a category you have browsed",
            CandidateSource::SimilarPrice => "In a similar price range",
            CandidateSource::LastSearchResult => "From your last search",
            CandidateSource::MatchingFilter => "Matches your search filters",
        }
    }
}

/// A related product together with the first rule that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedProduct {
    pub product: ProductRef,
    pub source: CandidateSource,
}

/// A catalog product annotated with its recommendation score (0 - 100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: ProductRef,
    pub score: u32,
}

/// One row per distinct visited product.
///
/// `view_count` is always 1: the visited list deduplicates by id, so it records which
/// products were seen, not how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewedProductRow {
    pub id: ProductId,
    pub name: String,
    pub view_count: u32,
}

/// One row per distinct recent page. `visit_count` is always 1 for the same reason as
/// [`ViewedProductRow::view_count`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedPageRow {
    pub path: String,
    pub title: String,
    pub visit_count: u32,
}

/// Session analytics summary. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub top_viewed_products: Vec<ViewedProductRow>,
    pub top_visited_pages: Vec<VisitedPageRow>,
    /// Spread of recent page timestamps divided by page count; a rough dispersion figure
    pub average_session_duration_ms: f64,
    /// Placeholder heuristic in 0..=100, not derived from purchases
    pub conversion_rate: f64,
    pub recommendations: Vec<ScoredProduct>,
}
