//! Session analytics report

use tracing::debug;

use super::scoring::ScoreEngine;
use super::types::*;
use super::{CONVERSION_RATE_PER_VISIT, MAX_CONVERSION_RATE};
use crate::catalog::Catalog;
use crate::domain::history::{HistorySnapshot, RecentPageEntry};

#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    settings: RecommendationSettings,
    scorer: ScoreEngine,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: RecommendationSettings) -> Self {
        Self { settings, scorer: ScoreEngine::with_settings(settings) }
    }

    pub fn generate_report<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
        snapshot: &HistorySnapshot,
    ) -> SessionReport {
        let top_viewed_products = snapshot
            .visited_products
            .iter()
            .take(self.settings.top_products)
            .map(|id| ViewedProductRow {
                id: id.clone(),
                name: catalog
                    .find(id)
                    .map(|product| product.name.clone())
                    .unwrap_or_else(|| id.0.clone()),
                view_count: 1,
            })
            .collect();

        let top_visited_pages = snapshot
            .recent_pages
            .iter()
            .take(self.settings.top_pages)
            .map(|page| VisitedPageRow {
                path: page.path.clone(),
                title: page.title.clone(),
                visit_count: 1,
            })
            .collect();

        let mut recommendations = self.scorer.rank_unvisited(catalog, snapshot);
        recommendations.truncate(self.settings.max_recommendations);

        let report = SessionReport {
            top_viewed_products,
            top_visited_pages,
            average_session_duration_ms: average_session_duration_ms(&snapshot.recent_pages),
            conversion_rate: conversion_rate(snapshot.visited_products.len()),
            recommendations,
        };

        debug!(
            event_name = "recommendations.report.generated",
            viewed = report.top_viewed_products.len(),
            pages = report.top_visited_pages.len(),
            recommendations = report.recommendations.len(),
            "session report generated"
        );

        report
    }
}

/// `(newest - oldest) / page_count` over the MRU page list, or 0 with fewer than two pages.
pub fn average_session_duration_ms(pages: &[RecentPageEntry]) -> f64 {
    match (pages.first(), pages.last()) {
        (Some(newest), Some(oldest)) if pages.len() > 1 => {
            newest.visited_at_ms.saturating_sub(oldest.visited_at_ms) as f64 / pages.len() as f64
        }
        _ => 0.0,
    }
}

/// Placeholder heuristic: 0.15 points per distinct visited product, capped at 100.
pub fn conversion_rate(visited_count: usize) -> f64 {
    (visited_count as f64 * CONVERSION_RATE_PER_VISIT).min(MAX_CONVERSION_RATE)
}
