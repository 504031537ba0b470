use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use flate2::{write::GzEncoder, Compression};
use numparser::app::{build_router, AppState};
use numparser::catalog::CategorySection;
use numparser::categories::SectionRef;
use numparser::client::{CatalogApi, NumparserClient};
use numparser::config::FilterConfig;
use numparser::error::{is_empty_response, CatalogError};
use numparser::fill::{fill_section, load_sections, DESIRED_COUNT};
use numparser::filter::WatchFilter;
use numparser::hash::{ContentHasher, HostHasher};
use numparser::history::HistorySnapshot;
use numparser::models::{FavoriteRecord, ItemId};
use serde_json::{json, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

fn movie(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {id}"),
        "original_title": format!("Original {id}"),
        "poster_path": format!("/p{id}.jpg"),
        "vote_average": 7.1,
        "release_date": "2023-05-01"
    })
}

fn write_category(dir: &Path, name: &str, items: &[Value]) {
    let body = serde_json::to_vec(items).expect("serialize");
    std::fs::write(dir.join(format!("{name}.json")), body).expect("write category");
}

fn write_gz_category(dir: &Path, name: &str, items: &[Value]) {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&serde_json::to_vec(items).expect("serialize"))
        .expect("compress");
    let body = enc.finish().expect("finish gzip");
    std::fs::write(dir.join(format!("{name}.json.gz")), body).expect("write category");
}

fn releases(count: i64) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let items: Vec<Value> = (1..=count).map(movie).collect();
    write_category(dir.path(), "lampac_movies", &items);
    dir
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn filter_for(snapshot: HistorySnapshot) -> WatchFilter {
    let snapshot = Arc::new(snapshot);
    WatchFilter::new(
        FilterConfig::default(),
        snapshot.clone(),
        snapshot.clone(),
        snapshot,
        Arc::new(HostHasher),
    )
}

fn watched(id: i64) -> FavoriteRecord {
    FavoriteRecord {
        id: ItemId::Num(id),
        thrown: false,
        history: true,
        seasons: Vec::new(),
    }
}

#[tokio::test]
async fn health_answers_ok() {
    let dir = releases(1);
    let app = build_router(AppState::new(dir.path()));
    let res = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn serves_requested_page() {
    let dir = releases(45);
    let app = build_router(AppState::new(dir.path()));
    let (status, doc) = get_json(app, "/lampac_movies?page=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["page"], 3);
    assert_eq!(doc["total_pages"], 3);
    assert_eq!(doc["total_results"], 45);
    let results = doc["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0]["id"], 41);
}

#[tokio::test]
async fn honours_per_page() {
    let dir = releases(45);
    let app = build_router(AppState::new(dir.path()));
    let (_, doc) = get_json(app, "/lampac_movies?per_page=10").await;
    assert_eq!(doc["page"], 1);
    assert_eq!(doc["total_pages"], 5);
    assert_eq!(doc["results"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn serves_gzipped_release_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let items: Vec<Value> = (1..=25).map(movie).collect();
    write_gz_category(dir.path(), "lampac_movies", &items);
    let app = build_router(AppState::new(dir.path()));

    let (status, doc) = get_json(app.clone(), "/lampac_movies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["total_results"], 25);
    assert_eq!(doc["total_pages"], 2);
    assert_eq!(doc["results"].as_array().unwrap().len(), 20);

    let (_, doc) = get_json(app, "/lampac_movies?page=2").await;
    let results = doc["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[4]["id"], 25);
}

#[tokio::test]
async fn gzipped_file_wins_over_plain_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_category(dir.path(), "anime_id", &[movie(1)]);
    write_gz_category(dir.path(), "anime_id", &[movie(7), movie(8)]);
    let app = build_router(AppState::new(dir.path()));
    let (status, doc) = get_json(app, "/anime_id").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["total_results"], 2);
    assert_eq!(doc["results"][0]["id"], 7);
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let dir = releases(1);
    let app = build_router(AppState::new(dir.path()));
    let (status, _) = get_json(app.clone(), "/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(app, "/lampac.movies").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn zero_page_is_rejected() {
    let dir = releases(1);
    let app = build_router(AppState::new(dir.path()));
    let (status, doc) = get_json(app.clone(), "/lampac_movies?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(doc["status"], "error");
    let (status, _) = get_json(app, "/lampac_movies?per_page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn broken_release_file_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
    let app = build_router(AppState::new(dir.path()));
    let (status, _) = get_json(app, "/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn reloads_file_after_it_changes() {
    let dir = releases(3);
    let state = AppState::new(dir.path());
    let (_, doc) = get_json(build_router(state.clone()), "/lampac_movies").await;
    assert_eq!(doc["total_results"], 3);

    // make sure the modification time moves
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let items: Vec<Value> = (1..=7).map(movie).collect();
    write_category(dir.path(), "lampac_movies", &items);

    let (_, doc) = get_json(build_router(state), "/lampac_movies").await;
    assert_eq!(doc["total_results"], 7);
}

#[tokio::test]
async fn client_normalizes_and_hides_watched_movies() {
    let dir = releases(5);
    let addr = spawn(build_router(AppState::new(dir.path()))).await;

    let snapshot = HistorySnapshot::new()
        .with_favorite(watched(2))
        .with_favorite(watched(3))
        .with_progress(HostHasher.hash("3"), Some(45.0));
    let client = NumparserClient::new(
        &format!("http://{addr}"),
        "ru",
        "NUMParser",
        filter_for(snapshot),
    )
    .unwrap();

    let page = client.list("lampac_movies", 1).await.unwrap();
    let ids: Vec<ItemId> = page.results.iter().filter_map(|i| i.id.clone()).collect();
    assert_eq!(
        ids,
        vec![ItemId::Num(1), ItemId::Num(3), ItemId::Num(4), ItemId::Num(5)]
    );
    assert_eq!(page.filtered_out, 1);
    assert_eq!(page.total_results, 5);
    let first = &page.results[0];
    assert_eq!(first.source, "NUMParser");
    assert_eq!(first.promo_title, "Movie 1");
    assert_eq!(first.original_language, "en");
    assert_eq!(first.overview, "");
}

#[tokio::test]
async fn client_reports_missing_category_as_upstream_error() {
    let dir = releases(1);
    let addr = spawn(build_router(AppState::new(dir.path()))).await;
    let client = NumparserClient::new(
        &format!("http://{addr}"),
        "ru",
        "NUMParser",
        filter_for(HistorySnapshot::new()),
    )
    .unwrap();
    let err = client.list("missing", 1).await.unwrap_err();
    match err.downcast_ref::<CatalogError>() {
        Some(CatalogError::Upstream { status, .. }) => assert_eq!(*status, 404),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn empty_upstream_body_is_distinct_from_zero_results() {
    let app = Router::new()
        .route("/empty", get(|| async { "" }))
        .route("/null", get(|| async { "null" }))
        .route("/none", get(|| async { r#"{"results": [], "total_results": 0}"# }));
    let addr = spawn(app).await;
    let client = NumparserClient::new(
        &format!("http://{addr}"),
        "ru",
        "NUMParser",
        filter_for(HistorySnapshot::new()),
    )
    .unwrap();

    let err = client.list("empty", 1).await.unwrap_err();
    assert!(is_empty_response(&err));
    let err = client.list("null", 1).await.unwrap_err();
    assert!(is_empty_response(&err));
    let page = client.list("none", 1).await.unwrap();
    assert!(page.results.is_empty());
}

#[tokio::test]
async fn fill_loop_tops_up_a_filtered_section() {
    let dir = releases(60);
    let addr = spawn(build_router(AppState::new(dir.path()))).await;

    // hide every odd movie: history without any progress record
    let snapshot = (1..=60)
        .filter(|id| id % 2 == 1)
        .fold(HistorySnapshot::new(), |s, id| s.with_favorite(watched(id)));
    let filter = filter_for(snapshot);
    let api: Arc<dyn CatalogApi> = Arc::new(
        NumparserClient::new(
            &format!("http://{addr}"),
            "ru",
            "NUMParser",
            filter.clone(),
        )
        .unwrap(),
    );

    let loaded = load_sections(
        api.clone(),
        vec![
            SectionRef {
                slug: "lampac_movies".to_string(),
                title: "Movies".to_string(),
            },
            SectionRef {
                slug: "missing".to_string(),
                title: "Missing".to_string(),
            },
        ],
        1,
    )
    .await;
    assert_eq!(loaded.len(), 2);
    assert!(loaded[1].result.is_err());

    let mut section: CategorySection = loaded
        .into_iter()
        .next()
        .and_then(|s| s.result.ok())
        .expect("movies section");
    assert_eq!(section.results.len(), 10);
    assert_eq!(section.total_results, 50);
    assert_eq!(section.total_pages, 3);
    assert_eq!(section.original_total_pages, 3);

    let outcome = fill_section(api.as_ref(), &filter, &mut section).await;
    assert!(outcome.interrupted.is_none());
    assert_eq!(outcome.pages_fetched, 1);
    assert_eq!(section.results.len(), DESIRED_COUNT);
    assert_eq!(section.page, 2);
    assert!(section.more);
    assert!(section
        .results
        .iter()
        .all(|i| matches!(i.id, Some(ItemId::Num(n)) if n % 2 == 0)));
}
