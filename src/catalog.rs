//! Shapes raw upstream pages into [`CatalogPage`]s and category sections.
use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CatalogError;
use crate::filter::WatchFilter;
use crate::models::{CatalogPage, ContentItem, ItemId};

pub const PAGE_SIZE: u64 = 20;

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First non-empty string among `keys`.
fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn first_count(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(|v| v.as_f64()))
        .find(|n| *n >= 1.0)
        .map(|n| n as u64)
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Season counts come as integers, floats or numeric strings.
fn season_count(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn passthrough(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| truthy(v)).cloned()
}

/// Maps one upstream entry, defaulting every missing or malformed field.
pub fn normalize_item(raw: &Value, source: &str) -> Option<ContentItem> {
    let obj = raw.as_object()?;

    let title = first_str(obj, &["title", "name"]).unwrap_or_default();
    let original_title = first_str(obj, &["original_title", "original_name"]).unwrap_or_default();
    let overview = first_str(obj, &["overview", "description"]).unwrap_or_default();
    let promo_title = if title.is_empty() {
        original_title.clone()
    } else {
        title.clone()
    };

    Some(ContentItem {
        id: obj.get("id").and_then(ItemId::from_value),
        poster_path: first_str(obj, &["poster_path", "poster"]).unwrap_or_default(),
        backdrop_path: first_str(obj, &["backdrop_path", "backdrop"]).unwrap_or_default(),
        vote_average: number(obj.get("vote_average")),
        original_language: first_str(obj, &["original_language"])
            .unwrap_or_else(|| "en".to_string()),
        source: source.to_string(),
        img: obj.get("img").filter(|v| !v.is_null()).cloned(),
        background_image: obj.get("background_image").filter(|v| !v.is_null()).cloned(),
        first_air_date: passthrough(obj, "first_air_date").map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }),
        number_of_seasons: season_count(obj.get("number_of_seasons")),
        release_quality: passthrough(obj, "release_quality"),
        release_date: first_str(obj, &["release_date"]),
        last_air_date: first_str(obj, &["last_air_date"]),
        last_episode_to_air: passthrough(obj, "last_episode_to_air"),
        promo: overview.clone(),
        promo_title,
        title,
        original_title,
        overview,
    })
}

/// Normalizes an upstream page and runs the watch filter over it.
///
/// A `null` document is an [`CatalogError::EmptyResponse`], not an empty page.
pub fn normalize_page(json: &Value, source: &str, filter: &WatchFilter) -> Result<CatalogPage> {
    let Some(obj) = json.as_object() else {
        if json.is_null() {
            return Err(CatalogError::EmptyResponse.into());
        }
        anyhow::bail!("Unexpected catalog document: expected an object");
    };

    let items: Vec<ContentItem> = obj
        .get("results")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|raw| normalize_item(raw, source))
                .collect()
        })
        .unwrap_or_default();

    let before = items.len();
    let results = filter.filter(items);
    let filtered_out = before - results.len();
    if filtered_out > 0 {
        debug!(filtered_out, kept = results.len(), "Normalized catalog page");
    }

    Ok(CatalogPage {
        results,
        page: clamp_u32(first_count(obj, &["page"]).unwrap_or(1)),
        total_pages: clamp_u32(first_count(obj, &["total_pages", "pagesCount"]).unwrap_or(1)),
        total_results: first_count(obj, &["total_results", "total"]).unwrap_or(0),
        filtered_out,
    })
}

/// A category row as handed to the host, with totals adjusted for filtered items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySection {
    pub url: String,
    pub title: String,
    pub page: u32,
    pub total_results: u64,
    pub total_pages: u32,
    pub more: bool,
    pub results: Vec<ContentItem>,
    pub source: String,
    pub original_total_results: u64,
    pub original_total_pages: u32,
}

impl CategorySection {
    pub fn from_page(url: &str, title: &str, page: u32, data: CatalogPage, source: &str) -> Self {
        let mut total_results = data.total_results;
        let mut total_pages = data.total_pages;
        if data.filtered_out > 0 {
            total_results = total_results.saturating_sub(data.filtered_out as u64);
            total_pages = total_results.div_ceil(PAGE_SIZE) as u32;
        }
        Self {
            url: url.to_string(),
            title: title.to_string(),
            page,
            total_results,
            total_pages,
            more: total_pages > page,
            results: data.results,
            source: source.to_string(),
            original_total_results: data.total_results,
            original_total_pages: data.total_pages,
        }
    }
}
