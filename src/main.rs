use lendfolio::cache::{Cache, CacheStore, MemoryCacheStore, SqliteCacheStore};
use lendfolio::config::CacheBackend;
use lendfolio::{
    api, config::Config, db::init_db, Clock, LendingApiDataSource, LendingDataSource, Repository,
    SystemClock, WalletSession,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let session = match WalletSession::restore(repo.clone(), clock.clone()).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to restore wallet session: {}", e);
            std::process::exit(1);
        }
    };

    match repo.purge_expired_cache_entries(clock.now()).await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Purged {} expired cache entries", n),
        Err(e) => tracing::warn!("Failed to purge expired cache entries: {}", e),
    }

    let store: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Sqlite => Arc::new(SqliteCacheStore::new(repo.clone())),
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
    };
    let cache = Cache::new(store, clock.clone());

    let datasource: Arc<dyn LendingDataSource> = Arc::new(
        LendingApiDataSource::new(config.lending_api_url.clone())
            .with_max_retry(Duration::from_secs(config.http_max_retry_secs)),
    );

    let state = api::AppState::new(config, datasource, cache, session, clock);
    if state.session.is_connected().await {
        let view = state.aggregator.load().await;
        tracing::info!(
            "Initial portfolio: {} positions, total value {}",
            view.snapshot.positions.len(),
            view.snapshot.total_value
        );
    }

    let app = api::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
