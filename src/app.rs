//! Release catalog server: pages through `{releases_dir}/{category}.json.gz`
//! (or a plain `.json` next to it).
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    io::Read,
    path::{Path as FsPath, PathBuf},
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::Mutex;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::config::Settings;

const CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Clone)]
pub struct AppState {
    pub releases_dir: Arc<PathBuf>,
    pub cache: Arc<Mutex<HashMap<String, CachedRelease>>>,
}

#[derive(Clone, Debug)]
pub struct CachedRelease {
    pub items: Arc<Vec<Value>>,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub loaded_at: Instant,
}

impl AppState {
    pub fn new(releases_dir: impl Into<PathBuf>) -> Self {
        Self {
            releases_dir: Arc::new(releases_dir.into()),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub async fn run_server(settings: &Settings) -> Result<()> {
    let state = AppState::new(settings.releases_dir.clone());
    info!("Serving releases from {}", state.releases_dir.display());

    let app = build_router(state);
    info!("Listening on {}", settings.bind);
    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/:category", get(get_category))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

async fn get_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 || per_page == 0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "page and per_page must be positive",
        );
    }
    if !is_valid_category(&category) {
        return error_response(StatusCode::NOT_FOUND, "Unknown category");
    }

    let items = match load_release(&state, &category).await {
        Ok(Some(items)) => items,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Unknown category"),
        Err(e) => {
            error!("Failed to load category '{}': {:?}", category, e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load category",
            );
        }
    };

    Json(paginate(&items, page, per_page)).into_response()
}

/// Builds the page document; pages past the end come back with no results.
pub fn paginate(items: &[Value], page: u32, per_page: u32) -> Value {
    let total_results = items.len();
    let per_page = per_page as usize;
    let total_pages = total_results.div_ceil(per_page);
    let start = (page as usize - 1).saturating_mul(per_page).min(total_results);
    let end = start.saturating_add(per_page).min(total_results);
    json!({
        "page": page,
        "results": &items[start..end],
        "total_pages": total_pages,
        "total_results": total_results,
    })
}

pub fn is_valid_category(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// First existing release file for `category`, gzipped one preferred.
async fn locate_release(
    dir: &FsPath,
    category: &str,
) -> Result<Option<(PathBuf, std::fs::Metadata)>> {
    for name in [format!("{category}.json.gz"), format!("{category}.json")] {
        let path = dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => return Ok(Some((path, meta))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e).with_context(|| format!("stat {}", path.display())),
        }
    }
    Ok(None)
}

fn decode_release(path: &FsPath, bytes: &[u8]) -> Result<Vec<Value>> {
    let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    if is_gz {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .with_context(|| format!("decompressing {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    } else {
        serde_json::from_slice(bytes).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Cached contents of a category file; `None` when the file does not exist.
///
/// Entries are reused for an hour unless the file's modification time changes.
async fn load_release(state: &AppState, category: &str) -> Result<Option<Arc<Vec<Value>>>> {
    let Some((path, meta)) = locate_release(&state.releases_dir, category).await? else {
        return Ok(None);
    };
    let modified = meta.modified().ok();

    {
        let guard = state.cache.lock().await;
        if let Some(entry) = guard.get(category) {
            let fresh = entry.loaded_at.elapsed() < CACHE_TTL;
            if entry.path == path && entry.modified == modified && fresh {
                return Ok(Some(entry.items.clone()));
            }
        }
    }

    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let decode_path = path.clone();
    let items = tokio::task::spawn_blocking(move || decode_release(&decode_path, &bytes))
        .await
        .context("release decoding task failed")??;
    let items = Arc::new(items);
    debug!(category, count = items.len(), path = %path.display(), "Loaded release file");

    state.cache.lock().await.insert(
        category.to_string(),
        CachedRelease {
            items: items.clone(),
            path,
            modified,
            loaded_at: Instant::now(),
        },
    );
    Ok(Some(items))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginates_with_ceiling_page_count() {
        let items: Vec<Value> = (0..45).map(|i| json!({ "id": i })).collect();
        let doc = paginate(&items, 3, 20);
        assert_eq!(doc["page"], 3);
        assert_eq!(doc["total_pages"], 3);
        assert_eq!(doc["total_results"], 45);
        assert_eq!(doc["results"].as_array().unwrap().len(), 5);
        assert_eq!(doc["results"][0]["id"], 40);

        let past_end = paginate(&items, 9, 20);
        assert!(past_end["results"].as_array().unwrap().is_empty());

        let empty = paginate(&[], 1, 20);
        assert_eq!(empty["total_pages"], 0);
    }

    #[test]
    fn category_names_are_restricted() {
        assert!(is_valid_category("lampac_movies_4k"));
        assert!(is_valid_category("movies_id_2024"));
        assert!(!is_valid_category(""));
        assert!(!is_valid_category("../etc/passwd"));
        assert!(!is_valid_category("a.json"));
    }

    #[test]
    fn decodes_gzipped_and_plain_releases() {
        use flate2::{write::GzEncoder, Compression};
        use std::io::Write;

        let body = br#"[{"id": 1}, {"id": 2}]"#;
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(body).unwrap();
        let gz = enc.finish().unwrap();

        let items = decode_release(FsPath::new("movies.json.gz"), &gz).unwrap();
        assert_eq!(items.len(), 2);
        let items = decode_release(FsPath::new("movies.json"), body).unwrap();
        assert_eq!(items[1]["id"], 2);
        assert!(decode_release(FsPath::new("movies.json.gz"), body).is_err());
    }
}
