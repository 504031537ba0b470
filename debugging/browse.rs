//! Load the visible category sections from the upstream, hide watched items and
//! top each section up to a full row. Prints the result as JSON.
//! Usage:
//!   cargo run --bin browse
//!   cargo run --bin browse -- --category anime
//!   cargo run --bin browse -- --category lampac_movies --page 2
//! Requires NUMPARSER_BASE_URL; NUMPARSER_HISTORY points at a storage export (.env supported).

use anyhow::Result;
use chrono::{Datelike, Utc};
use dotenvy::dotenv;
use numparser::categories;
use numparser::client::{CatalogApi, NumparserClient};
use numparser::config::Settings;
use numparser::fill::{fill_section, load_sections};
use numparser::filter::WatchFilter;
use numparser::hash::HostHasher;
use numparser::history::HistorySnapshot;
use serde_json::json;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

struct Args {
    category: Option<String>,
    page: u32,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        category: None,
        page: 1,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--category" => parsed.category = args.next(),
            "--page" => {
                if let Some(n) = args.next().and_then(|v| v.parse::<u32>().ok()) {
                    parsed.page = n.max(1);
                }
            }
            other => warn!("Ignoring unknown argument '{}'", other),
        }
    }
    parsed
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();
    let args = parse_args();

    let settings = Settings::from_env()?;
    settings.log_summary();

    let snapshot = match &settings.history_path {
        Some(path) => HistorySnapshot::from_path(path)?,
        None => {
            warn!("NUMPARSER_HISTORY not set, nothing will be hidden");
            HistorySnapshot::new()
        }
    };
    let snapshot = Arc::new(snapshot);
    let filter = WatchFilter::new(
        settings.filter,
        snapshot.clone(),
        snapshot.clone(),
        snapshot,
        Arc::new(HostHasher),
    );
    let client = NumparserClient::from_settings(&settings, filter.clone())?;
    let api: Arc<dyn CatalogApi> = Arc::new(client);

    let sections = match args.category {
        Some(name) => vec![categories::section_for(&name)],
        None => categories::visible_sections(&settings.visibility, Utc::now().year()),
    };
    info!("Loading {} sections (page {})", sections.len(), args.page);

    let mut rows = Vec::new();
    for loaded in load_sections(api.clone(), sections, args.page).await {
        let mut section = match loaded.result {
            Ok(s) => s,
            Err(e) => {
                rows.push(json!({
                    "url": loaded.section.slug,
                    "title": loaded.section.title,
                    "error": format!("{:#}", e),
                }));
                continue;
            }
        };
        let outcome = fill_section(api.as_ref(), &filter, &mut section).await;
        info!(
            "'{}': {} items after {} extra pages",
            section.title,
            section.results.len(),
            outcome.pages_fetched
        );
        let mut row = serde_json::to_value(&section)?;
        if let Some(e) = outcome.interrupted {
            row["fill_error"] = json!(format!("{:#}", e));
        }
        rows.push(row);
    }

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
