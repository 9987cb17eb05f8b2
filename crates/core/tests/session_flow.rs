use std::sync::{Arc, Mutex};

use browsetrail_core::history::{HistoryEvent, HistoryStore, LoadOutcome, ManualClock, DAY_MS};
use browsetrail_core::recommendations::ReportBuilder;
use browsetrail_core::storage::MemoryBlobStore;
use browsetrail_core::{CandidateAggregator, ProductId, ProductRef, StaticCatalog};

const T0: i64 = 1_700_000_000_000;

fn catalog() -> StaticCatalog {
    StaticCatalog::new(vec![
        ProductRef::new("a1", "A", 100.0).with_name("Anvil"),
        ProductRef::new("a2", "A", 110.0).with_name("Axe"),
        ProductRef::new("a3", "A", 300.0).with_name("Auger"),
        ProductRef::new("b1", "B", 105.0).with_name("Bolt cutter"),
        ProductRef::new("b2", "B", 20.0).with_name("Brush"),
    ])
}

fn store(storage: Arc<MemoryBlobStore>, clock: Arc<ManualClock>) -> HistoryStore {
    HistoryStore::new(storage).with_storage_key("flow:session").with_clock(clock)
}

#[test]
fn browsing_session_produces_consistent_report() {
    let storage = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let mut history = store(storage, clock.clone());
    history.load();

    for id in ["a1", "b2", "a2"] {
        history.record_product_visit(id);
    }
    history.record_page_visit("/tools", "Tools");
    clock.advance(3_000);
    history.record_page_visit("/tools/axes", "Axes");

    let catalog = catalog();
    let report = ReportBuilder::new().generate_report(&catalog, &history.snapshot());

    let viewed: Vec<(&str, &str)> = report
        .top_viewed_products
        .iter()
        .map(|row| (row.id.as_str(), row.name.as_str()))
        .collect();
    assert_eq!(viewed, vec![("a2", "Axe"), ("b2", "Brush"), ("a1", "Anvil")]);

    let pages: Vec<&str> = report.top_visited_pages.iter().map(|row| row.path.as_str()).collect();
    assert_eq!(pages, vec!["/tools/axes", "/tools"]);
    assert_eq!(report.average_session_duration_ms, 1_500.0);
    assert!((report.conversion_rate - 0.45).abs() < 1e-9);

    let ranked: Vec<(&str, u32)> = report
        .recommendations
        .iter()
        .map(|item| (item.product.id.as_str(), item.score))
        .collect();
    assert_eq!(ranked, vec![("a3", 20), ("b1", 20)]);
    assert!(report.recommendations.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert!(report
        .recommendations
        .iter()
        .all(|item| !history.visited_products().contains(&item.product.id)));
}

#[test]
fn reload_restores_state_and_evicts_stale_pages() {
    let storage = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(T0));

    let mut first = store(storage.clone(), clock.clone());
    first.load();
    first.record_page_visit("/old", "Old");
    clock.advance(20 * DAY_MS);
    first.record_page_visit("/recent", "Recent");
    first.record_product_visit("a1");
    first.save_search("anvil", Vec::new(), Default::default());
    drop(first);

    clock.advance(15 * DAY_MS);
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut second = store(storage, clock);
    let sink = events.clone();
    second.subscribe(move |event| {
        if let Ok(mut events) = sink.lock() {
            events.push(event.clone());
        }
    });

    let outcome = second.load();

    assert_eq!(outcome, LoadOutcome::Restored { evicted_pages: 1 });
    let pages: Vec<&str> = second.recent_pages().iter().map(|page| page.path.as_str()).collect();
    assert_eq!(pages, vec!["/recent"]);
    assert_eq!(second.visited_products(), &[ProductId::new("a1")]);
    assert_eq!(second.last_search().term, "anvil");
    assert!(second.last_search().results.is_empty());

    let events = events.lock().map(|events| events.clone()).unwrap_or_default();
    assert!(events.contains(&HistoryEvent::Loaded));
}

#[test]
fn related_products_follow_visit_history() {
    let storage = Arc::new(MemoryBlobStore::new());
    let mut history = store(storage, Arc::new(ManualClock::new(T0)));
    history.load();
    history.record_product_visit("a2");

    let related = CandidateAggregator::new().related_products(
        &ProductId::new("a1"),
        &catalog(),
        &history.snapshot(),
    );
    let ids: Vec<&str> = related.iter().map(|product| product.id.as_str()).collect();

    // a2 is visited and shares the category; b1 is within the price band.
    assert_eq!(ids, vec!["a2", "b1"]);
}
