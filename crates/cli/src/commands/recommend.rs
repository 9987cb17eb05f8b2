use browsetrail_core::domain::product::ProductId;
use browsetrail_core::recommendations::{CandidateAggregator, ReportBuilder, ScoreEngine};
use serde_json::{json, Value};

use super::session::{SessionArgs, SessionContext};
use super::CommandResult;

type Outcome = anyhow::Result<(String, Option<Value>)>;

pub fn related(args: &SessionArgs, product_id: &str) -> CommandResult {
    CommandResult::from_outcome("related", run_related(args, product_id))
}

pub fn score(args: &SessionArgs, product_id: &str) -> CommandResult {
    CommandResult::from_outcome("score", run_score(args, product_id))
}

pub fn report(args: &SessionArgs) -> CommandResult {
    CommandResult::from_outcome("report", run_report(args))
}

fn run_related(args: &SessionArgs, product_id: &str) -> Outcome {
    let session = SessionContext::open(args)?;
    let catalog = session.catalog()?;
    let aggregator = CandidateAggregator::with_settings(session.config.recommendations.settings());

    let related = aggregator.related_with_sources(
        &ProductId::new(product_id),
        &catalog,
        &session.store.snapshot(),
    );

    Ok((format!("{} related product(s) for `{product_id}`", related.len()), Some(json!(related))))
}

fn run_score(args: &SessionArgs, product_id: &str) -> Outcome {
    let session = SessionContext::open(args)?;
    let catalog = session.catalog()?;
    let engine = ScoreEngine::with_settings(session.config.recommendations.settings());

    let score = engine.recommendation_score(
        &ProductId::new(product_id),
        &catalog,
        &session.store.snapshot(),
    );

    Ok((
        format!("recommendation score for `{product_id}` is {score}"),
        Some(json!({ "id": product_id, "score": score })),
    ))
}

fn run_report(args: &SessionArgs) -> Outcome {
    let session = SessionContext::open(args)?;
    let catalog = session.catalog()?;
    let builder = ReportBuilder::with_settings(session.config.recommendations.settings());

    let report = builder.generate_report(&catalog, &session.store.snapshot());

    Ok((
        format!(
            "session report with {} recommendation(s)",
            report.recommendations.len()
        ),
        Some(json!(report)),
    ))
}
