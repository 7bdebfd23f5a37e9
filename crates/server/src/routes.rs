use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use showrunner_core::error::ApiError;
use showrunner_core::{Episode, IndexerKind, Show, ShowId, ShowOptions};
use showrunner_queue::show_queue::{QueueSnapshot, ShowTaskSnapshot};
use showrunner_queue::{AddRequest, QueueItem, ShowStatus, ShowTask};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(queue_snapshot))
        .route("/queue/pause", post(pause_queue))
        .route("/queue/resume", post(resume_queue))
        .route("/queue/tasks/{task_id}", get(get_task))
        .route("/shows", get(list_shows).post(add_show))
        .route("/shows/{indexer}/{id}", get(get_show).delete(remove_show))
        .route("/shows/{indexer}/{id}/update", post(update_show))
        .route("/shows/{indexer}/{id}/refresh", post(refresh_show))
        .route("/shows/{indexer}/{id}/rename", post(rename_show))
        .route("/shows/{indexer}/{id}/subtitles", post(subtitle_show))
        .route("/shows/{indexer}/{id}/change-source", post(change_source))
        .route("/events", get(sse_events))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    queue_paused: bool,
    pending_tasks: usize,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        queue_paused: state.queue.is_paused(),
        pending_tasks: state.queue.queue().len(),
    }))
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

async fn queue_snapshot(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.queue.snapshot())
}

async fn pause_queue(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.queue.pause();
    Json(serde_json::json!({ "paused": true }))
}

async fn resume_queue(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.queue.resume();
    Json(serde_json::json!({ "paused": false }))
}

/// Running or pending task by id. Finished tasks are no longer tracked.
async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ShowTaskSnapshot>, AppError> {
    let snapshot = state.queue.snapshot();
    snapshot
        .current
        .into_iter()
        .chain(snapshot.pending)
        .find(|t| t.id == task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id} is not queued")).into())
}

fn accepted(task: &ShowTask) -> (StatusCode, Json<ShowTaskSnapshot>) {
    (StatusCode::ACCEPTED, Json(task.info().snapshot()))
}

// ---------------------------------------------------------------------------
// Shows
// ---------------------------------------------------------------------------

fn show_id(indexer: &str, id: u64) -> Result<ShowId, AppError> {
    IndexerKind::parse(indexer)
        .map(|kind| ShowId::new(kind, id))
        .ok_or_else(|| ApiError::BadRequest(format!("unknown indexer {indexer:?}")).into())
}

fn find_show(state: &AppState, id: ShowId) -> Result<Arc<Show>, AppError> {
    state
        .queue
        .library()
        .find(id)
        .ok_or_else(|| ApiError::NotFound(format!("show {id} not found")).into())
}

#[derive(Serialize)]
struct ShowSummary {
    id: ShowId,
    name: String,
    location: PathBuf,
    network: Option<String>,
    episode_count: usize,
    activity: ShowStatus,
}

#[derive(Serialize)]
struct ShowDetail {
    id: ShowId,
    name: String,
    location: PathBuf,
    overview: Option<String>,
    network: Option<String>,
    genres: Vec<String>,
    status: Option<String>,
    first_aired: Option<NaiveDate>,
    imdb_id: Option<String>,
    options: ShowOptions,
    episodes: Vec<Episode>,
    activity: ShowStatus,
}

async fn list_shows(State(state): State<AppState>) -> Json<Vec<ShowSummary>> {
    let shows = state
        .queue
        .library()
        .list()
        .into_iter()
        .map(|show| {
            let activity = state.queue.status_of(show.id());
            show.read(|d| ShowSummary {
                id: show.id(),
                name: d.name.clone(),
                location: d.location.clone(),
                network: d.network.clone(),
                episode_count: d.episodes.len(),
                activity,
            })
        })
        .collect();
    Json(shows)
}

async fn get_show(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
) -> Result<Json<ShowDetail>, AppError> {
    let id = show_id(&indexer, id)?;
    let show = find_show(&state, id)?;
    let activity = state.queue.status_of(id);
    let data = show.snapshot();
    Ok(Json(ShowDetail {
        id,
        name: data.name,
        location: data.location,
        overview: data.overview,
        network: data.network,
        genres: data.genres,
        status: data.status,
        first_aired: data.first_aired,
        imdb_id: data.imdb_id,
        options: data.options,
        episodes: data.episodes.into_values().collect(),
        activity,
    }))
}

async fn add_show(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state.queue.add_show(request)?;
    Ok(accepted(&task))
}

#[derive(Deserialize)]
struct RemoveParams {
    #[serde(default)]
    purge: bool,
}

async fn remove_show(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
    Query(params): Query<RemoveParams>,
) -> Result<impl IntoResponse, AppError> {
    let task = state.queue.remove_show(show_id(&indexer, id)?, params.purge)?;
    Ok(accepted(&task))
}

#[derive(Deserialize)]
struct UpdateParams {
    /// Comma-separated season numbers. Absent means the whole show.
    seasons: Option<String>,
}

fn parse_seasons(raw: &str) -> Result<Vec<u32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| {
                AppError::from(ApiError::BadRequest(format!("invalid season number {s:?}")))
            })
        })
        .collect()
}

async fn update_show(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
    Query(params): Query<UpdateParams>,
) -> Result<impl IntoResponse, AppError> {
    let id = show_id(&indexer, id)?;
    let task = match params.seasons.as_deref() {
        Some(raw) => state.queue.update_seasons(id, parse_seasons(raw)?)?,
        None => state.queue.update_show(id)?,
    };
    Ok(accepted(&task))
}

#[derive(Deserialize)]
struct RefreshParams {
    #[serde(default)]
    force: bool,
}

async fn refresh_show(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
    Query(params): Query<RefreshParams>,
) -> Result<axum::response::Response, AppError> {
    let id = show_id(&indexer, id)?;
    Ok(match state.queue.refresh_show(id, params.force)? {
        Some(task) => accepted(&task).into_response(),
        None => Json(serde_json::json!({ "skipped": true })).into_response(),
    })
}

async fn rename_show(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
) -> Result<impl IntoResponse, AppError> {
    let task = state.queue.rename_episodes(show_id(&indexer, id)?)?;
    Ok(accepted(&task))
}

async fn subtitle_show(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
) -> Result<impl IntoResponse, AppError> {
    let task = state.queue.download_subtitles(show_id(&indexer, id)?)?;
    Ok(accepted(&task))
}

#[derive(Deserialize)]
struct ChangeSourceRequest {
    indexer: String,
    id: u64,
}

async fn change_source(
    State(state): State<AppState>,
    Path((indexer, id)): Path<(String, u64)>,
    Json(body): Json<ChangeSourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = show_id(&indexer, id)?;
    let target = show_id(&body.indexer, body.id)?;
    let task = state.queue.change_source(current, target)?;
    Ok(accepted(&task))
}

// ---------------------------------------------------------------------------
// SSE Events
// ---------------------------------------------------------------------------

async fn sse_events(
    State(state): State<AppState>,
) -> axum::response::Sse<
    impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;
    use std::time::Duration;

    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(evt) => {
                    if let Ok(data) = serde_json::to_string(&evt) {
                        yield Ok(Event::default().event(evt.name()).data(data));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default()
                        .event("error")
                        .data(format!(r#"{{"lagged":{n}}}"#)));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    axum::response::Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
