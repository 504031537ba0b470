//! Read-only views over the host's watch state, plus an in-memory snapshot
//! that implements all of them from an exported storage dump.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::models::{FavoriteRecord, ItemId, SeasonDescriptor, TimetableEntry, ViewProgress};

pub trait FavoriteStore: Send + Sync {
    fn favorite(&self, id: &ItemId) -> Option<FavoriteRecord>;
}

pub trait ProgressStore: Send + Sync {
    fn view_progress(&self, hash: &str) -> Option<ViewProgress>;
}

pub trait TimetableSource: Send + Sync {
    fn timetable(&self) -> Vec<TimetableEntry>;
}

#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    favorites: HashMap<ItemId, FavoriteRecord>,
    file_view: HashMap<String, ViewProgress>,
    timetable: Vec<TimetableEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    favorite: RawFavorite,
    #[serde(default)]
    file_view: HashMap<String, ViewProgress>,
    #[serde(default)]
    timetable: Vec<TimetableEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFavorite {
    #[serde(default)]
    card: Vec<RawCard>,
    #[serde(default)]
    history: Vec<ItemId>,
    #[serde(default)]
    thrown: Vec<ItemId>,
}

#[derive(Debug, Deserialize)]
struct RawCard {
    #[serde(default)]
    id: Option<ItemId>,
    #[serde(default)]
    seasons: Option<Vec<SeasonDescriptor>>,
}

impl HistorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawSnapshot =
            serde_json::from_str(text).context("Failed to parse history snapshot JSON")?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history snapshot {}", path.display()))?;
        Self::from_json(&text)
    }

    fn from_raw(raw: RawSnapshot) -> Self {
        let history: HashSet<ItemId> = raw.favorite.history.into_iter().collect();
        let thrown: HashSet<ItemId> = raw.favorite.thrown.into_iter().collect();

        let mut favorites = HashMap::new();
        for card in raw.favorite.card {
            let Some(id) = card.id else {
                continue;
            };
            let seasons = card.seasons.unwrap_or_default();
            let entry = favorites.entry(id.clone()).or_insert_with(|| FavoriteRecord {
                id: id.clone(),
                thrown: thrown.contains(&id),
                history: history.contains(&id),
                seasons: Vec::new(),
            });
            // first card carrying seasons wins
            if entry.seasons.is_empty() {
                entry.seasons = seasons;
            }
        }
        for id in history.iter().chain(thrown.iter()) {
            favorites.entry(id.clone()).or_insert_with(|| FavoriteRecord {
                id: id.clone(),
                thrown: thrown.contains(id),
                history: history.contains(id),
                seasons: Vec::new(),
            });
        }

        Self {
            favorites,
            file_view: raw.file_view,
            timetable: raw.timetable,
        }
    }

    pub fn with_favorite(mut self, record: FavoriteRecord) -> Self {
        self.favorites.insert(record.id.clone(), record);
        self
    }

    pub fn with_progress(mut self, hash: impl Into<String>, percent: Option<f64>) -> Self {
        self.file_view.insert(hash.into(), ViewProgress { percent });
        self
    }

    pub fn with_timetable(mut self, entry: TimetableEntry) -> Self {
        self.timetable.push(entry);
        self
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }
}

impl FavoriteStore for HistorySnapshot {
    fn favorite(&self, id: &ItemId) -> Option<FavoriteRecord> {
        self.favorites.get(id).cloned()
    }
}

impl ProgressStore for HistorySnapshot {
    fn view_progress(&self, hash: &str) -> Option<ViewProgress> {
        self.file_view.get(hash).copied()
    }
}

impl TimetableSource for HistorySnapshot {
    fn timetable(&self) -> Vec<TimetableEntry> {
        self.timetable.clone()
    }
}
