mod config;
mod content;
mod errors;
mod export;
mod models;
mod render;
mod routes;
mod state;
mod templates;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::content::profession::JsonProfessionDirectory;
use crate::export::rate_limit::{CounterStore, InMemoryCounterStore, RateLimiter, RedisCounterStore};
use crate::render::avatar::ExifAvatarProcessor;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting portfolio export API v{}", env!("CARGO_PKG_VERSION"));

    // Rate-limit counters: Redis when configured, process memory otherwise
    let window = Duration::from_secs(config.rate_limit_window_secs);
    let store: Arc<dyn CounterStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisCounterStore::connect(url).await?;
            info!("Rate limiter using Redis");
            Arc::new(store)
        }
        None => {
            let store = Arc::new(InMemoryCounterStore::new());
            spawn_purge_task(store.clone(), window);
            info!("Rate limiter using in-process counters");
            store
        }
    };
    let rate_limiter = Arc::new(RateLimiter::new(store, config.rate_limit_max, window));

    // Profession directory (empty when the file is missing)
    let professions = JsonProfessionDirectory::load(&config.occupations_path).await;
    info!(
        "Profession directory loaded: {} entries from {}",
        professions.len(),
        config.occupations_path.display()
    );

    let avatar_processor = Arc::new(ExifAvatarProcessor::new(
        config.avatar_fetch_remote,
        config.avatar_max_bytes,
    ));

    // Build app state
    let state = AppState {
        rate_limiter,
        professions: Arc::new(professions),
        avatar_processor,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Sweeps expired in-process rate-limit windows once per window.
fn spawn_purge_task(store: Arc<InMemoryCounterStore>, window: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {purged} expired rate-limit windows");
            }
        }
    });
}
