use std::sync::Arc;

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use platepal_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, CacheWriterHandle, MemoryStore, PgStore, Store},
    middleware::{make_span_with_request_id, request_id_middleware},
    routes::{create_router, AppState},
    services::{auth::TokenManager, providers::GooglePlacesProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("platepal_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::new(create_pool(url).await?);
            store.migrate().await?;
            tracing::info!("Using PostgreSQL store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let (cache, cache_writer): (Option<Cache>, Option<CacheWriterHandle>) =
        match config.redis_url.as_deref() {
            Some(url) => {
                let (cache, writer) = Cache::connect(create_redis_client(url)?)
                    .await
                    .context("Failed to connect to Redis")?;
                tracing::info!("Caching place searches for {}s", config.places_cache_ttl);
                (Some(cache), Some(writer))
            }
            None => (None, None),
        };

    let places = GooglePlacesProvider::new(
        config.google_api_key.clone(),
        config.places_api_url.clone(),
        cache,
        config.places_cache_ttl,
    )?;
    let tokens = TokenManager::new(&config.jwt_secret, config.token_lifetime()?);

    let state = Arc::new(AppState::new(store, Arc::new(places), tokens));

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
