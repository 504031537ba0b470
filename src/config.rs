use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use crate::categories::{CategoryVisibility, CATEGORIES, YEAR_GROUPS};

pub const DEFAULT_SOURCE_NAME: &str = "NUMParser";
pub const DEFAULT_LANGUAGE: &str = "ru";
pub const DEFAULT_MIN_PROGRESS: u8 = 90;
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub hide_watched: bool,
    /// Percent (0-100) at which a movie counts as watched.
    pub min_progress: u8,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hide_watched: true,
            min_progress: DEFAULT_MIN_PROGRESS,
        }
    }
}

impl FilterConfig {
    pub fn threshold(&self) -> f64 {
        f64::from(self.min_progress)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Option<String>,
    pub source_name: String,
    pub language: String,
    pub filter: FilterConfig,
    pub visibility: CategoryVisibility,
    pub releases_dir: PathBuf,
    pub bind: SocketAddr,
    pub history_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get("NUMPARSER_BASE_URL").map(|u| u.trim_end_matches('/').to_string());
        let source_name =
            get("NUMPARSER_SOURCE_NAME").unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());
        let language = get("NUMPARSER_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let hide_watched = match get("NUMPARSER_HIDE_WATCHED") {
            Some(v) => parse_bool("NUMPARSER_HIDE_WATCHED", &v)?,
            None => true,
        };
        let min_progress = match get("NUMPARSER_MIN_PROGRESS") {
            Some(v) => parse_percent(&v)?,
            None => DEFAULT_MIN_PROGRESS,
        };

        let mut visibility = CategoryVisibility::default();
        let keys = CATEGORIES.iter().map(|c| c.key);
        for key in keys.chain(YEAR_GROUPS.iter().map(|g| g.key)) {
            let var = format!("NUMPARSER_CATEGORY_{}", key.to_ascii_uppercase());
            if let Some(v) = get(&var) {
                visibility.set(key, parse_bool(&var, &v)?);
            }
        }

        let releases_dir = get("NUMPARSER_RELEASES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_default()
                    .join("releases")
            });
        let bind_raw = get("NUMPARSER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid NUMPARSER_BIND '{}'", bind_raw))?;
        let history_path = get("NUMPARSER_HISTORY").map(PathBuf::from);

        Ok(Self {
            base_url,
            source_name,
            language,
            filter: FilterConfig {
                hide_watched,
                min_progress,
            },
            visibility,
            releases_dir,
            bind,
            history_path,
        })
    }

    pub fn require_base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| anyhow!("Missing required environment variable: NUMPARSER_BASE_URL"))
    }

    pub fn log_summary(&self) {
        info!(
            source = %self.source_name,
            language = %self.language,
            hide_watched = self.filter.hide_watched,
            min_progress = self.filter.min_progress,
            "Loaded settings"
        );
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("Invalid boolean for {}: '{}'", key, other),
    }
}

fn parse_percent(value: &str) -> Result<u8> {
    let parsed: u8 = value
        .parse()
        .with_context(|| format!("Invalid NUMPARSER_MIN_PROGRESS '{}'", value))?;
    if parsed > 100 {
        bail!(
            "NUMPARSER_MIN_PROGRESS must be between 0 and 100, got {}",
            parsed
        );
    }
    Ok(parsed)
}
