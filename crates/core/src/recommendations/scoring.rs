//! Scoring algorithm for recommendations

use super::types::*;
use super::{CATEGORY_AFFINITY_POINTS, MAX_SCORE, PRICE_AFFINITY_POINTS};
use crate::catalog::Catalog;
use crate::domain::history::HistorySnapshot;
use crate::domain::product::{ProductId, ProductRef};

/// Score engine for "you might also like" ranking
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    settings: RecommendationSettings,
}

impl ScoreEngine {
    /// Create a new score engine with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom settings
    pub fn with_settings(settings: RecommendationSettings) -> Self {
        Self { settings }
    }

    /// Score for `product_id` in 0..=100, or 0 when the product is not in the catalog
    pub fn recommendation_score<C: Catalog + ?Sized>(
        &self,
        product_id: &ProductId,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> u32 {
        catalog
            .find(product_id)
            .map(|target| self.score_product(target, catalog, snapshot))
            .unwrap_or(0)
    }

    /// Score an already-resolved catalog product
    pub fn score_product<C: Catalog + ?Sized>(
        &self,
        target: &ProductRef,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> u32 {
        let category_affinity = self.category_affinity(target, catalog, snapshot);
        let price_affinity = self.price_affinity(target, catalog, snapshot);
        Self::combine(category_affinity, price_affinity)
    }

    /// Number of visited catalog products sharing the target's category
    pub fn category_affinity<C: Catalog + ?Sized>(
        &self,
        target: &ProductRef,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> u32 {
        count(catalog, |product| {
            product.category == target.category && snapshot.has_visited(&product.id)
        })
    }

    /// Number of visited catalog products inside the target's price band
    pub fn price_affinity<C: Catalog + ?Sized>(
        &self,
        target: &ProductRef,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> u32 {
        let band = self.settings.price_band;
        count(catalog, |product| {
            target.within_price_band(product.price, band) && snapshot.has_visited(&product.id)
        })
    }

    /// Weighted affinity sum, capped at [`MAX_SCORE`]
    pub fn combine(category_affinity: u32, price_affinity: u32) -> u32 {
        let raw = category_affinity
            .saturating_mul(CATEGORY_AFFINITY_POINTS)
            .saturating_add(price_affinity.saturating_mul(PRICE_AFFINITY_POINTS));
        raw.min(MAX_SCORE)
    }

    /// Unvisited catalog products by descending score. Equal scores keep catalog order.
    pub fn rank_unvisited<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> Vec<ScoredProduct> {
        let mut ranked: Vec<ScoredProduct> = catalog
            .products()
            .iter()
            .filter(|product| !snapshot.has_visited(&product.id))
            .map(|product| ScoredProduct {
                product: product.clone(),
                score: self.score_product(product, catalog, snapshot),
            })
            .collect();

        // `sort_by` is stable, which keeps catalog order for ties.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}

fn count<C: Catalog + ?Sized>(catalog: &C, predicate: impl Fn(&ProductRef) -> bool) -> u32 {
    let matches = catalog.products().iter().filter(|&product| predicate(product)).count();
    u32::try_from(matches).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visited(ids: &[&str]) -> HistorySnapshot {
        HistorySnapshot {
            visited_products: ids.iter().map(|id| ProductId::new(*id)).collect(),
            ..HistorySnapshot::default()
        }
    }

    #[test]
    fn raw_score_above_one_hundred_is_clamped() {
        assert_eq!(ScoreEngine::combine(11, 4), 100);
        assert_eq!(ScoreEngine::combine(3, 2), 40);
        assert_eq!(ScoreEngine::combine(0, 0), 0);
    }

    #[test]
    fn clamp_applies_through_catalog_scoring() {
        // 11 visited products in the target's category; 4 of them in its price band.
        let mut catalog = vec![ProductRef::new("target", "tools", 100.0)];
        for n in 0..11 {
            let price = if n < 4 { 110.0 } else { 500.0 };
            catalog.push(ProductRef::new(format!("v-{n}"), "tools", price));
        }
        let visited_ids: Vec<String> = (0..11).map(|n| format!("v-{n}")).collect();
        let visited_refs: Vec<&str> = visited_ids.iter().map(String::as_str).collect();
        let snapshot = visited(&visited_refs);
        let engine = ScoreEngine::new();
        let target = &catalog[0];

        assert_eq!(engine.category_affinity(target, &catalog, &snapshot), 11);
        assert_eq!(engine.price_affinity(target, &catalog, &snapshot), 4);
        assert_eq!(
            engine.recommendation_score(&ProductId::new("target"), &catalog, &snapshot),
            100
        );
    }

    #[test]
    fn unknown_product_scores_zero() {
        let catalog = vec![ProductRef::new("a", "x", 1.0)];
        let snapshot = visited(&["a"]);
        let score =
            ScoreEngine::new().recommendation_score(&ProductId::new("zzz"), &catalog, &snapshot);

        assert_eq!(score, 0);
    }

    #[test]
    fn affinities_count_visited_products_only() {
        let catalog = vec![
            ProductRef::new("target", "garden", 40.0),
            ProductRef::new("same-cat", "garden", 400.0),
            ProductRef::new("same-price", "kitchen", 44.0),
            ProductRef::new("both", "garden", 38.0),
            ProductRef::new("unvisited", "garden", 40.0),
        ];
        let snapshot = visited(&["same-cat", "same-price", "both"]);

        let score =
            ScoreEngine::new().recommendation_score(&ProductId::new("target"), &catalog, &snapshot);

        // category: same-cat, both = 2 -> 20; price: same-price, both = 2 -> 10
        assert_eq!(score, 30);
    }

    #[test]
    fn ranking_excludes_visited_and_keeps_catalog_order_for_ties() {
        let catalog = vec![
            ProductRef::new("x1", "shoes", 500.0),
            ProductRef::new("s1", "socks", 10.0),
            ProductRef::new("s2", "socks", 11.0),
            ProductRef::new("x2", "shoes", 900.0),
            ProductRef::new("seen", "socks", 10.5),
        ];
        let snapshot = visited(&["seen"]);

        let ranked = ScoreEngine::new().rank_unvisited(&catalog, &snapshot);
        let order: Vec<(&str, u32)> =
            ranked.iter().map(|item| (item.product.id.as_str(), item.score)).collect();

        assert_eq!(order, vec![("s1", 15), ("s2", 15), ("x1", 0), ("x2", 0)]);
    }
}
