//! Commands that record or prune session history.

use anyhow::Context;
use browsetrail_core::catalog::Catalog;
use browsetrail_core::domain::history::AppliedFilters;
use browsetrail_core::domain::product::{ProductId, ProductRef};
use browsetrail_core::errors::ApplicationError;
use serde_json::{json, Value};

use super::session::{SessionArgs, SessionContext};
use super::CommandResult;

type Outcome = anyhow::Result<(String, Option<Value>)>;

pub fn visit_product(args: &SessionArgs, product_id: &str) -> CommandResult {
    CommandResult::from_outcome("visit-product", run_visit_product(args, product_id))
}

pub fn visit_page(args: &SessionArgs, path: &str, title: Option<&str>) -> CommandResult {
    CommandResult::from_outcome("visit-page", run_visit_page(args, path, title))
}

pub fn search(
    args: &SessionArgs,
    term: &str,
    filters: &[String],
    result_ids: &[String],
) -> CommandResult {
    CommandResult::from_outcome("search", run_search(args, term, filters, result_ids))
}

pub fn recent(args: &SessionArgs, limit: usize) -> CommandResult {
    CommandResult::from_outcome("recent", run_recent(args, limit))
}

pub fn gc(args: &SessionArgs) -> CommandResult {
    CommandResult::from_outcome("gc", run_gc(args))
}

pub fn reset(args: &SessionArgs) -> CommandResult {
    CommandResult::from_outcome("reset", run_reset(args))
}

pub fn show(args: &SessionArgs) -> CommandResult {
    CommandResult::from_outcome("show", run_show(args))
}

fn run_visit_product(args: &SessionArgs, product_id: &str) -> Outcome {
    let product_id = non_empty("product id", product_id)?;
    let mut session = SessionContext::open(args)?;
    session.store.record_product_visit(product_id);

    let visited = session.store.visited_products().to_vec();
    Ok((
        format!("recorded visit to product `{product_id}`"),
        Some(json!({ "visited_products": visited })),
    ))
}

fn run_visit_page(args: &SessionArgs, path: &str, title: Option<&str>) -> Outcome {
    let path = non_empty("page path", path)?;
    let mut session = SessionContext::open(args)?;
    session.store.record_page_visit(path, title.unwrap_or(path));

    let pages = session.store.recent_pages().to_vec();
    Ok((format!("recorded visit to page `{path}`"), Some(json!({ "recent_pages": pages }))))
}

fn run_search(
    args: &SessionArgs,
    term: &str,
    filters: &[String],
    result_ids: &[String],
) -> Outcome {
    let applied_filters = parse_filters(filters)?;
    let mut session = SessionContext::open(args)?;

    let results = if result_ids.is_empty() {
        Vec::new()
    } else {
        let catalog = session.catalog()?;
        resolve_results(&catalog, result_ids)?
    };

    session.store.save_search(term, results, applied_filters);

    let search = session.store.last_search().clone();
    Ok((
        format!("saved search `{term}` with {} result(s)", search.results.len()),
        Some(json!({ "last_search": search })),
    ))
}

fn run_recent(args: &SessionArgs, limit: usize) -> Outcome {
    let session = SessionContext::open(args)?;
    let catalog = session.catalog()?;
    let products = session.store.recently_viewed(&catalog, limit);

    Ok((format!("{} recently viewed product(s)", products.len()), Some(json!(products))))
}

fn run_gc(args: &SessionArgs) -> Outcome {
    let mut session = SessionContext::open(args)?;
    let evicted = session.store.garbage_collect_now();

    Ok((
        format!("evicted {evicted} stale page(s)"),
        Some(json!({ "evicted": evicted, "remaining": session.store.recent_pages().len() })),
    ))
}

fn run_reset(args: &SessionArgs) -> Outcome {
    let mut session = SessionContext::open(args)?;
    session.store.reset();
    session.store.save().map_err(ApplicationError::from).context("persisting reset history")?;

    Ok((format!("history for session `{}` cleared", args.session), None))
}

fn run_show(args: &SessionArgs) -> Outcome {
    let session = SessionContext::open(args)?;
    let snapshot = session.store.snapshot();

    Ok((
        format!(
            "{} product(s), {} page(s) in history",
            snapshot.visited_products.len(),
            snapshot.recent_pages.len()
        ),
        Some(json!({ "history": snapshot, "ui_flags": session.store.ui_flags() })),
    ))
}

fn non_empty<'a>(label: &str, value: &'a str) -> Result<&'a str, ApplicationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApplicationError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed)
}

/// Parses `key=value` pairs. Values are read as JSON when they parse, otherwise as strings.
fn parse_filters(raw: &[String]) -> Result<AppliedFilters, ApplicationError> {
    let mut filters = AppliedFilters::new();
    for pair in raw {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ApplicationError::InvalidInput(format!(
                "filter `{pair}` must be written as key=value"
            )));
        };
        let key = non_empty("filter key", key)?;
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        filters.insert(key.to_string(), value);
    }
    Ok(filters)
}

fn resolve_results<C: Catalog + ?Sized>(
    catalog: &C,
    result_ids: &[String],
) -> Result<Vec<ProductRef>, ApplicationError> {
    result_ids
        .iter()
        .map(|id| {
            catalog.find(&ProductId::new(id.as_str())).cloned().ok_or_else(|| {
                ApplicationError::InvalidInput(format!(
                    "search result `{id}` is not in the catalog"
                ))
            })
        })
        .collect()
}
