pub mod commands;

use std::process::ExitCode;

use browsetrail_core::config::{AppConfig, LogFormat};
use clap::{Parser, Subcommand};

use commands::session::SessionArgs;

#[derive(Debug, Parser)]
#[command(
    name = "browsetrail",
    about = "Browsing history and recommendation CLI",
    long_about = "Record product and page visits per session, inspect history, and compute related products, scores, and session reports.",
    after_help = "Examples:\n  browsetrail visit-product p-100\n  browsetrail --catalog demos/catalog.json related p-100\n  browsetrail report --session alice"
)]
pub struct Cli {
    #[command(flatten)]
    session: SessionArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Record a product view at the front of the recently viewed list")]
    VisitProduct { id: String },
    #[command(about = "Record a page visit with the current timestamp")]
    VisitPage {
        path: String,
        #[arg(long, help = "Page title (defaults to the path)")]
        title: Option<String>,
    },
    #[command(about = "Save the last search term, result ids, and applied filters")]
    Search {
        term: String,
        #[arg(long = "filter", value_name = "KEY=VALUE", help = "Applied filter, repeatable")]
        filters: Vec<String>,
        #[arg(long = "result", value_name = "PRODUCT_ID", help = "Search result id, repeatable")]
        results: Vec<String>,
    },
    #[command(about = "List related products for a product with the rule that matched each")]
    Related { id: String },
    #[command(about = "Compute the 0-100 recommendation score for a product")]
    Score { id: String },
    #[command(about = "List recently viewed products that exist in the catalog")]
    Recent {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    #[command(about = "Generate the session analytics report")]
    Report,
    #[command(about = "Print the current history snapshot")]
    Show,
    #[command(about = "Evict page visits older than the configured max age")]
    Gc,
    #[command(about = "Clear all history for the session")]
    Reset,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Ok(config) = cli.session.load_config() {
        init_logging(&config);
    }

    let args = &cli.session;
    let result = match &cli.command {
        Command::VisitProduct { id } => commands::history::visit_product(args, id),
        Command::VisitPage { path, title } => {
            commands::history::visit_page(args, path, title.as_deref())
        }
        Command::Search { term, filters, results } => {
            commands::history::search(args, term, filters, results)
        }
        Command::Related { id } => commands::recommend::related(args, id),
        Command::Score { id } => commands::recommend::score(args, id),
        Command::Recent { limit } => commands::history::recent(args, *limit),
        Command::Report => commands::recommend::report(args),
        Command::Show => commands::history::show(args),
        Command::Gc => commands::history::gc(args),
        Command::Reset => commands::history::reset(args),
        Command::Config => commands::config::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
