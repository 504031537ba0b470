use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::{EpisodeDescriptor, ItemId, SeasonDescriptor, TimetableEntry};

/// Parses an air date the way the host does: a bare `YYYY-MM-DD` is midnight UTC.
/// Timestamps without an offset are read as UTC.
pub fn parse_air_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|dt| dt.and_utc())
}

fn aired_before(air_date: Option<&str>, now: DateTime<Utc>) -> bool {
    air_date
        .and_then(parse_air_date)
        .map(|date| date < now)
        .unwrap_or(false)
}

/// One descriptor per episode of every real season that has already started airing.
pub fn from_seasons(seasons: &[SeasonDescriptor], now: DateTime<Utc>) -> Vec<EpisodeDescriptor> {
    seasons
        .iter()
        .filter(|s| {
            s.season_number > 0 && s.episode_count > 0 && aired_before(s.air_date.as_deref(), now)
        })
        .flat_map(|s| {
            (1..=s.episode_count).map(move |episode_number| EpisodeDescriptor {
                season_number: s.season_number,
                episode_number,
                air_date: None,
            })
        })
        .collect()
}

/// Aired, non-special episodes listed for `show` in the timetable.
pub fn from_timetable(
    show: &ItemId,
    timetable: &[TimetableEntry],
    now: DateTime<Utc>,
) -> Vec<EpisodeDescriptor> {
    let Some(episodes) = timetable
        .iter()
        .find(|entry| &entry.id == show && entry.episodes.is_some())
        .and_then(|entry| entry.episodes.as_ref())
    else {
        return Vec::new();
    };
    episodes
        .iter()
        .filter(|e| e.season_number > 0 && aired_before(e.air_date.as_deref(), now))
        .cloned()
        .collect()
}

/// Concatenates both lists and keeps the first descriptor of every (season, episode) pair.
pub fn merge(
    primary: Vec<EpisodeDescriptor>,
    secondary: Vec<EpisodeDescriptor>,
) -> Vec<EpisodeDescriptor> {
    let mut unique: Vec<EpisodeDescriptor> = Vec::with_capacity(primary.len() + secondary.len());
    for episode in primary.into_iter().chain(secondary) {
        let seen = unique.iter().any(|e| {
            e.season_number == episode.season_number && e.episode_number == episode.episode_number
        });
        if !seen {
            unique.push(episode);
        }
    }
    unique
}

pub fn released_episodes(
    show: &ItemId,
    seasons: &[SeasonDescriptor],
    timetable: &[TimetableEntry],
    now: DateTime<Utc>,
) -> Vec<EpisodeDescriptor> {
    merge(
        from_seasons(seasons, now),
        from_timetable(show, timetable, now),
    )
}
