use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use showrunner_metadata::provider::Indexers;
use showrunner_metadata::tmdb::TmdbClient;
use showrunner_queue::artwork::ArtworkCache;
use showrunner_queue::{ShowLibrary, ShowQueue, ShowServices};
use showrunner_server::config::ServerConfig;
use showrunner_server::state::{AppState, ServerEvent};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    info!(db_path = %config.db_path, "connecting to database");

    let pool = showrunner_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;
    let applied = showrunner_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!(applied, "migrations complete");

    let library = Arc::new(ShowLibrary::new(pool.clone()));
    library.load_all().await.context("failed to load shows")?;

    let mut indexers = Indexers::new();
    let mut cross_reference = None;
    match &config.tmdb_api_key {
        Some(key) => {
            let tmdb = Arc::new(TmdbClient::new(key.clone()));
            indexers.register(tmdb.clone());
            cross_reference = Some(tmdb);
        }
        None => warn!("SHOWRUNNER_TMDB_API_KEY not set, adds and updates will fail"),
    }

    std::fs::create_dir_all(&config.cache_dir).context("failed to create cache dir")?;
    let mut services = ShowServices::new(library, indexers)
        .with_config(config.library.clone())
        .with_artwork(Arc::new(ArtworkCache::new(config.cache_dir.clone())));
    if let Some(tmdb) = cross_reference {
        services = services.with_cross_reference(tmdb);
    }

    let queue = ShowQueue::new(services);
    let worker = queue.start();

    let (events_tx, _) = tokio::sync::broadcast::channel::<ServerEvent>(256);
    let shutdown = CancellationToken::new();

    // Heartbeat emitter
    {
        let tx = events_tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                }
                let _ = tx.send(ServerEvent::Heartbeat {
                    seq,
                    at: chrono::Utc::now(),
                });
                seq += 1;
            }
        });
    }

    let app_state = AppState::new(pool, queue.clone(), events_tx);
    let app = showrunner_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %config.bind_addr, "server listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            signal.cancel();
        })
        .await?;

    queue.shutdown();
    if let Err(e) = worker.await {
        warn!(error = %e, "queue worker ended abnormally");
    }
    Ok(())
}
