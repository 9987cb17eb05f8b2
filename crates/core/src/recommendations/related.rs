//! Candidate aggregation for "related products"

use std::collections::HashSet;

use tracing::debug;

use super::types::*;
use crate::catalog::Catalog;
use crate::domain::history::HistorySnapshot;
use crate::domain::product::{strict_equals, ProductId, ProductRef};

/// Builds the related-products list for a focal product.
///
/// Four candidate sets are concatenated in fixed precedence (visited same-category,
/// similar price, last search results, filter matches), deduplicated by id keeping the
/// first occurrence, and cut to `related_limit`. Within a set, catalog order is kept.
#[derive(Debug, Clone, Default)]
pub struct CandidateAggregator {
    settings: RecommendationSettings,
}

impl CandidateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: RecommendationSettings) -> Self {
        Self { settings }
    }

    /// Related products for `current_id`; empty when the product is not in the catalog.
    pub fn related_products<C: Catalog + ?Sized>(
        &self,
        current_id: &ProductId,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> Vec<ProductRef> {
        self.related_with_sources(current_id, catalog, snapshot)
            .into_iter()
            .map(|related| related.product)
            .collect()
    }

    /// Same as [`CandidateAggregator::related_products`] but keeps the rule that produced
    /// each entry.
    pub fn related_with_sources<C: Catalog + ?Sized>(
        &self,
        current_id: &ProductId,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> Vec<RelatedProduct> {
        let Some(current) = catalog.find(current_id) else {
            debug!(
                event_name = "recommendations.related.unknown_product",
                product_id = %current_id,
                "focal product not in catalog"
            );
            return Vec::new();
        };

        let candidates = self
            .visited_same_category(current, catalog, snapshot)
            .chain(self.similar_price(current, catalog))
            .chain(self.last_search_results(current, snapshot))
            .chain(self.matching_filters(current, catalog, snapshot));

        let mut seen = HashSet::new();
        candidates
            .filter(|(product, _)| seen.insert(product.id.clone()))
            .take(self.settings.related_limit)
            .map(|(product, source)| RelatedProduct { product: product.clone(), source })
            .collect()
    }

    fn visited_same_category<'a, C: Catalog + ?Sized>(
        &self,
        current: &'a ProductRef,
        catalog: &'a C,
        snapshot: &'a HistorySnapshot,
    ) -> impl Iterator<Item = (&'a ProductRef, CandidateSource)> + 'a {
        catalog
            .products()
            .iter()
            .filter(move |product| {
                product.category == current.category
                    && product.id != current.id
                    && snapshot.has_visited(&product.id)
            })
            .map(|product| (product, CandidateSource::VisitedSameCategory))
    }

    fn similar_price<'a, C: Catalog + ?Sized>(
        &self,
        current: &'a ProductRef,
        catalog: &'a C,
    ) -> impl Iterator<Item = (&'a ProductRef, CandidateSource)> + 'a {
        let band = self.settings.price_band;
        catalog
            .products()
            .iter()
            .filter(move |product| {
                product.id != current.id && current.within_price_band(product.price, band)
            })
            .map(|product| (product, CandidateSource::SimilarPrice))
    }

    fn last_search_results<'a>(
        &self,
        current: &'a ProductRef,
        snapshot: &'a HistorySnapshot,
    ) -> impl Iterator<Item = (&'a ProductRef, CandidateSource)> + 'a {
        snapshot
            .last_search
            .results
            .iter()
            .filter(move |product| product.id != current.id)
            .map(|product| (product, CandidateSource::LastSearchResult))
    }

    fn matching_filters<'a, C: Catalog + ?Sized>(
        &self,
        current: &'a ProductRef,
        catalog: &'a C,
        snapshot: &'a HistorySnapshot,
    ) -> impl Iterator<Item = (&'a ProductRef, CandidateSource)> + 'a {
        let filters = &snapshot.last_search.applied_filters;
        catalog
            .products()
            .iter()
            .filter(move |product| {
                product.id != current.id
                    && filters.iter().any(|(key, expected)| {
                        product.field(key).is_some_and(|actual| strict_equals(&actual, expected))
                    })
            })
            .map(|product| (product, CandidateSource::MatchingFilter))
    }
}
