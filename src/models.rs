use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Catalog identifiers arrive as numbers from most upstreams, strings from a few.
/// Equality is strict: `5` and `"5"` are different items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Num(i64),
    Text(String),
}

impl ItemId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ItemId::Num),
            Value::String(s) if !s.is_empty() => Some(ItemId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Num(n) => write!(f, "{n}"),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Option<ItemId>,
    pub title: String,
    pub original_title: String,
    pub original_language: String,
    pub overview: String,
    pub vote_average: f64,
    pub poster_path: String,
    pub backdrop_path: String,
    pub source: String,
    pub promo_title: String,
    pub promo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_seasons: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_quality: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_episode_to_air: Option<Value>,
}

impl ContentItem {
    /// Shows are recognised by a first-air-date or a season count; everything else is a movie.
    pub fn media_kind(&self) -> MediaKind {
        let aired = self
            .first_air_date
            .as_deref()
            .map(|d| !d.is_empty())
            .unwrap_or(false);
        let seasons = self.number_of_seasons.map(|n| n != 0.0).unwrap_or(false);
        if aired || seasons {
            MediaKind::Tv
        } else {
            MediaKind::Movie
        }
    }

    /// Title used for episode progress keys.
    pub fn display_title(&self) -> &str {
        if self.original_title.is_empty() {
            &self.title
        } else {
            &self.original_title
        }
    }

    /// Cards without an identifier or any title cannot be rendered.
    pub fn is_presentable(&self) -> bool {
        self.id.is_some() && !(self.title.is_empty() && self.original_title.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonDescriptor {
    #[serde(default)]
    pub season_number: i64,
    #[serde(default)]
    pub episode_count: i64,
    #[serde(default)]
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeDescriptor {
    #[serde(default)]
    pub season_number: i64,
    #[serde(default)]
    pub episode_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteRecord {
    pub id: ItemId,
    pub thrown: bool,
    pub history: bool,
    pub seasons: Vec<SeasonDescriptor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewProgress {
    #[serde(default)]
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: ItemId,
    #[serde(default)]
    pub episodes: Option<Vec<EpisodeDescriptor>>,
}

/// A normalized upstream page, already passed through the watch filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub results: Vec<ContentItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    /// Items present upstream but removed by the filter.
    #[serde(skip)]
    pub filtered_out: usize,
}
