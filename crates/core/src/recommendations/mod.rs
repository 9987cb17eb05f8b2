//! Related products, recommendation scoring and session reports
//!
//! All read paths take a [`crate::domain::history::HistorySnapshot`] and the catalog by
//! reference and never mutate either.

mod related;
mod report;
mod scoring;
mod types;

pub use related::CandidateAggregator;
pub use report::ReportBuilder;
pub use scoring::ScoreEngine;
pub use types::*;

/// Default read-path settings
pub const DEFAULT_SETTINGS: RecommendationSettings = RecommendationSettings {
    related_limit: 4,
    price_band: 0.2,
    top_products: 5,
    top_pages: 5,
    max_recommendations: 10,
};

/// Upper bound of a recommendation score
pub const MAX_SCORE: u32 = 100;

/// Points per visited product sharing the target's category
pub const CATEGORY_AFFINITY_POINTS: u32 = 10;

/// Points per visited product inside the target's price band
pub const PRICE_AFFINITY_POINTS: u32 = 5;

/// Conversion heuristic: percentage points per distinct visited product
pub const CONVERSION_RATE_PER_VISIT: f64 = 0.15;

/// Upper bound of the conversion heuristic
pub const MAX_CONVERSION_RATE: f64 = 100.0;
