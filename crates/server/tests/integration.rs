use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use showrunner_core::{IndexerKind, ShowId};
use showrunner_metadata::provider::{Indexer, Indexers};
use showrunner_metadata::{EpisodeInfo, MetadataError, SeriesMetadata};
use showrunner_queue::{LibraryConfig, ShowLibrary, ShowQueue, ShowServices};
use showrunner_server::routes::build_router;
use showrunner_server::state::AppState;

struct StubIndexer;

#[async_trait::async_trait]
impl Indexer for StubIndexer {
    fn kind(&self) -> IndexerKind {
        IndexerKind::Tmdb
    }

    fn name(&self) -> &str {
        "stub"
    }

    async fn get_series(&self, id: u64, _language: &str) -> Result<SeriesMetadata, MetadataError> {
        Ok(SeriesMetadata {
            name: format!("Series {id}"),
            ..Default::default()
        })
    }

    async fn get_episodes(&self, _id: u64, _language: &str) -> Result<Vec<EpisodeInfo>, MetadataError> {
        Ok(vec![EpisodeInfo {
            season_number: 1,
            episode_number: 1,
            title: Some("Pilot".into()),
            overview: None,
            air_date: chrono::NaiveDate::from_ymd_opt(2015, 6, 1),
        }])
    }
}

struct TestApp {
    server: TestServer,
    queue: ShowQueue,
    root: std::path::PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

/// Create a test server with an in-memory SQLite database and a paused queue.
async fn test_app() -> TestApp {
    let pool = showrunner_db::connect(":memory:").await.unwrap();
    showrunner_db::migrate::run(&pool).await.unwrap();

    let root = std::env::temp_dir().join(format!("sr_server_test_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();

    let library = Arc::new(ShowLibrary::new(pool.clone()));
    let services = ShowServices::new(library, Indexers::new().with(Arc::new(StubIndexer)))
        .with_config(LibraryConfig {
            root_dir: Some(root.clone()),
            write_nfo: false,
            ..Default::default()
        });
    let queue = ShowQueue::new(services);
    queue.pause();
    queue.start();

    let (events_tx, _) = tokio::sync::broadcast::channel(64);
    let state = AppState::new(pool, queue.clone(), events_tx);
    TestApp {
        server: TestServer::new(build_router(state)).unwrap(),
        queue,
        root,
    }
}

/// Add a show through the API and wait for the worker to finish it.
async fn add_and_wait(app: &TestApp, id: u64) {
    app.server
        .post("/api/v1/shows")
        .json(&json!({ "id": { "indexer": "tmdb", "id": id } }))
        .await
        .assert_status(StatusCode::ACCEPTED);
    app.server.post("/api/v1/queue/resume").await.assert_status_ok();

    let show = ShowId::new(IndexerKind::Tmdb, id);
    for _ in 0..500 {
        if app.queue.library().contains(show) && app.queue.status_of(show).kind.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    app.server.post("/api/v1/queue/pause").await.assert_status_ok();
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = test_app().await;
    let resp = app.server.get("/health").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue_paused"], true);
}

#[tokio::test]
async fn added_show_is_listed_with_episodes() {
    let app = test_app().await;
    add_and_wait(&app, 42).await;

    let list: Value = app.server.get("/api/v1/shows").await.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Series 42");
    assert_eq!(list[0]["episode_count"], 1);

    let detail = app.server.get("/api/v1/shows/tmdb/42").await;
    detail.assert_status_ok();
    let body: Value = detail.json();
    assert_eq!(body["episodes"][0]["title"], "Pilot");
    assert_eq!(body["activity"]["kind"], Value::Null);
}

#[tokio::test]
async fn adding_a_known_show_is_a_bad_request() {
    let app = test_app().await;
    add_and_wait(&app, 7).await;

    let resp = app
        .server
        .post("/api/v1/shows")
        .json(&json!({ "id": { "indexer": "tmdb", "id": 7 } }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn second_update_conflicts() {
    let app = test_app().await;
    add_and_wait(&app, 3).await;

    let first = app.server.post("/api/v1/shows/tmdb/3/update").await;
    first.assert_status(StatusCode::ACCEPTED);
    let task: Value = first.json();
    assert_eq!(task["kind"], "update");
    assert_eq!(task["state"], "pending");

    let second = app.server.post("/api/v1/shows/tmdb/3/update?seasons=1").await;
    second.assert_status(StatusCode::CONFLICT);
    let body: Value = second.json();
    assert_eq!(body["error"]["code"], "conflict");

    // An update ends in a refresh, so a plain refresh is skipped
    let refresh: Value = app.server.post("/api/v1/shows/tmdb/3/refresh").await.json();
    assert_eq!(refresh["skipped"], true);
    app.server
        .post("/api/v1/shows/tmdb/3/refresh?force=true")
        .await
        .assert_status(StatusCode::ACCEPTED);

    let task_id = task["id"].as_str().unwrap();
    let fetched: Value = app.server.get(&format!("/api/v1/queue/tasks/{task_id}")).await.json();
    assert_eq!(fetched["kind"], "update");
}

#[tokio::test]
async fn unknown_shows_and_indexers_are_rejected() {
    let app = test_app().await;
    app.server
        .post("/api/v1/shows/tmdb/999/rename")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get("/api/v1/shows/imdb/1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .post("/api/v1/shows/tmdb/1/update?seasons=one")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remove_jumps_the_queue_and_cancels_pending_work() {
    let app = test_app().await;
    add_and_wait(&app, 5).await;

    app.server
        .post("/api/v1/shows/tmdb/5/rename")
        .await
        .assert_status(StatusCode::ACCEPTED);
    app.server
        .post("/api/v1/shows/tmdb/5/subtitles")
        .await
        .assert_status(StatusCode::ACCEPTED);

    let remove = app.server.delete("/api/v1/shows/tmdb/5").await;
    remove.assert_status(StatusCode::ACCEPTED);
    let task: Value = remove.json();
    assert_eq!(task["priority"], 60);

    let queue: Value = app.server.get("/api/v1/queue").await.json();
    assert_eq!(queue["paused"], true);
    let pending = queue["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["kind"], "remove");

    app.server
        .delete("/api/v1/shows/tmdb/5")
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn change_source_validates_the_target() {
    let app = test_app().await;
    add_and_wait(&app, 8).await;

    app.server
        .post("/api/v1/shows/tmdb/8/change-source")
        .json(&json!({ "indexer": "tmdb", "id": 8 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let resp = app
        .server
        .post("/api/v1/shows/tmdb/8/change-source")
        .json(&json!({ "indexer": "tmdb", "id": 80 }))
        .await;
    resp.assert_status(StatusCode::ACCEPTED);

    let detail: Value = app.server.get("/api/v1/shows/tmdb/8").await.json();
    assert_eq!(detail["activity"]["kind"], "change_source");
}
