use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::config::FilterConfig;
use crate::episodes;
use crate::hash::{episode_key, ContentHasher};
use crate::history::{FavoriteStore, ProgressStore, TimetableSource};
use crate::models::{ContentItem, FavoriteRecord, MediaKind, TimetableEntry};

/// Removes fully watched and dismissed items from catalog pages.
///
/// Incomplete information always leans towards keeping an item visible.
#[derive(Clone)]
pub struct WatchFilter {
    config: FilterConfig,
    favorites: Arc<dyn FavoriteStore>,
    progress: Arc<dyn ProgressStore>,
    timetable: Arc<dyn TimetableSource>,
    hasher: Arc<dyn ContentHasher>,
}

impl WatchFilter {
    pub fn new(
        config: FilterConfig,
        favorites: Arc<dyn FavoriteStore>,
        progress: Arc<dyn ProgressStore>,
        timetable: Arc<dyn TimetableSource>,
        hasher: Arc<dyn ContentHasher>,
    ) -> Self {
        Self {
            config,
            favorites,
            progress,
            timetable,
            hasher,
        }
    }

    pub fn filter(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        self.filter_at(items, Utc::now())
    }

    /// Same as [`WatchFilter::filter`], judging air dates against `now`.
    pub fn filter_at(&self, items: Vec<ContentItem>, now: DateTime<Utc>) -> Vec<ContentItem> {
        if !self.config.hide_watched {
            return items;
        }
        let timetable = self.timetable.timetable();
        let before = items.len();
        let kept: Vec<ContentItem> = items
            .into_iter()
            .filter(|item| self.keep(item, &timetable, now))
            .collect();
        if kept.len() < before {
            debug!(
                removed = before - kept.len(),
                kept = kept.len(),
                "Filtered watched content"
            );
        }
        kept
    }

    fn keep(&self, item: &ContentItem, timetable: &[TimetableEntry], now: DateTime<Utc>) -> bool {
        let Some(record) = item.id.as_ref().and_then(|id| self.favorites.favorite(id)) else {
            return true;
        };
        if record.thrown {
            return false;
        }
        if !record.history {
            return true;
        }
        match item.media_kind() {
            MediaKind::Movie => self.keep_movie(item),
            MediaKind::Tv => self.keep_show(item, &record, timetable, now),
        }
    }

    fn keep_movie(&self, item: &ContentItem) -> bool {
        let mut hashes = Vec::with_capacity(2);
        if let Some(id) = &item.id {
            hashes.push(self.hasher.hash(&id.to_string()));
        }
        if !item.original_title.is_empty() {
            hashes.push(self.hasher.hash(&item.original_title));
        }

        let threshold = self.config.threshold();
        let mut has_progress = false;
        for hash in &hashes {
            let Some(view) = self.progress.view_progress(hash) else {
                continue;
            };
            has_progress = true;
            match view.percent {
                Some(percent) if percent != 0.0 && percent < threshold => {}
                _ => return false,
            }
        }
        // opened at some point but no position kept: treat as finished
        has_progress
    }

    fn keep_show(
        &self,
        item: &ContentItem,
        record: &FavoriteRecord,
        timetable: &[TimetableEntry],
        now: DateTime<Utc>,
    ) -> bool {
        let Some(id) = &item.id else {
            return true;
        };
        let released = episodes::released_episodes(id, &record.seasons, timetable, now);
        if released.is_empty() {
            return true;
        }
        let title = item.display_title();
        let threshold = self.config.threshold();
        let all_watched = released.iter().all(|episode| {
            let key = episode_key(episode.season_number, episode.episode_number, title);
            let percent = self
                .progress
                .view_progress(&self.hasher.hash(&key))
                .and_then(|v| v.percent)
                .unwrap_or(0.0);
            percent > threshold
        });
        !all_watched
    }
}
