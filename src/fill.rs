//! Loading category sections and topping them up after watched items were removed.
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::CategorySection;
use crate::categories::SectionRef;
use crate::client::CatalogApi;
use crate::filter::WatchFilter;
use crate::models::ContentItem;

/// Items a replenished section aims to show.
pub const DESIRED_COUNT: usize = 20;
/// Sections requested concurrently while loading the category screen.
pub const PART_SIZE: usize = 5;

#[derive(Debug)]
pub struct FillOutcome {
    pub pages_fetched: u32,
    /// The page request that stopped the loop early, if any.
    pub interrupted: Option<anyhow::Error>,
}

fn presentable(filter: &WatchFilter, items: Vec<ContentItem>) -> Vec<ContentItem> {
    filter
        .filter(items)
        .into_iter()
        .filter(ContentItem::is_presentable)
        .collect()
}

/// Requests following pages of the section's category, one at a time, until
/// [`DESIRED_COUNT`] presentable items are collected or the pages run out.
///
/// A failed page ends the loop; whatever was collected so far is kept.
pub async fn fill_section(
    api: &dyn CatalogApi,
    filter: &WatchFilter,
    section: &mut CategorySection,
) -> FillOutcome {
    let mut results = presentable(filter, std::mem::take(&mut section.results));
    let mut page = section.page.max(1);
    let total_pages = if section.original_total_pages > 0 {
        section.original_total_pages
    } else {
        section.total_pages.max(1)
    };

    let mut pages_fetched = 0;
    let mut interrupted = None;
    while results.len() < DESIRED_COUNT && page < total_pages {
        let next = page + 1;
        match api.list(&section.url, next).await {
            Ok(data) => {
                page = next;
                pages_fetched += 1;
                results.extend(presentable(filter, data.results));
            }
            Err(e) => {
                warn!("Stopped filling '{}' at page {}: {:#}", section.title, next, e);
                interrupted = Some(e);
                break;
            }
        }
    }

    results.truncate(DESIRED_COUNT);
    section.more = page < total_pages && results.len() == DESIRED_COUNT;
    section.page = page;
    section.results = results;

    FillOutcome {
        pages_fetched,
        interrupted,
    }
}

#[derive(Debug)]
pub struct SectionResult {
    pub section: SectionRef,
    pub result: Result<CategorySection>,
}

async fn load_one(
    api: Arc<dyn CatalogApi>,
    section: SectionRef,
    page: u32,
) -> Result<CategorySection> {
    let data = api.list(&section.slug, page).await?;
    Ok(CategorySection::from_page(
        &section.slug,
        &section.title,
        page,
        data,
        api.source_name(),
    ))
}

/// Loads `page` of every section, [`PART_SIZE`] requests at a time, keeping input order.
/// A failing section yields an error entry and does not stop the others.
pub async fn load_sections(
    api: Arc<dyn CatalogApi>,
    sections: Vec<SectionRef>,
    page: u32,
) -> Vec<SectionResult> {
    let page = page.max(1);
    let mut out = Vec::with_capacity(sections.len());
    for part in sections.chunks(PART_SIZE) {
        let handles: Vec<_> = part
            .iter()
            .cloned()
            .map(|section| {
                let api = api.clone();
                let task_section = section.clone();
                (section, tokio::spawn(load_one(api, task_section, page)))
            })
            .collect();
        for (section, handle) in handles {
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => Err(anyhow!("section task for '{}' failed: {}", section.slug, e)),
            };
            if let Err(e) = &result {
                warn!("Failed to load section '{}': {:#}", section.title, e);
            }
            out.push(SectionResult { section, result });
        }
    }
    info!(
        sections = out.len(),
        failed = out.iter().filter(|s| s.result.is_err()).count(),
        "Loaded category sections"
    );
    out
}
