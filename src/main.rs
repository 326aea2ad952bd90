//! Storefront Core - cart, checkout, orders and inventory over HTTP

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_core::api::{self, AppState};
use storefront_core::cache::ProductStockCache;
use storefront_core::events::EventBus;
use storefront_core::{AppConfig, MemoryStore, PgStore, Services, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let stock_cache = ProductStockCache::new(config.stock_cache_ttl);
    let mut events = EventBus::default().with_stock_cache(stock_cache.clone());
    if let Some(url) = &config.nats_url {
        match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                tracing::info!(%url, "Connected to NATS");
                events = events.with_nats(client, config.nats_subject_prefix.clone());
            }
            Err(e) => tracing::warn!(%url, error = %e, "NATS unavailable, events stay in-process"),
        }
    }

    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections).await?;
            store.migrate().await?;
            tracing::info!("Using PostgreSQL store");
            serve(store, &config, events, stock_cache).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(MemoryStore::new(), &config, events, stock_cache).await
        }
    }
}

async fn serve<S: Store>(store: S, config: &AppConfig, events: EventBus, stock_cache: ProductStockCache) -> Result<()> {
    let services = Services::new(Arc::new(store), events, stock_cache, config.commerce.clone());
    let app = api::router(AppState::new(services), config.request_timeout);

    let addr = config.socket_addr();
    tracing::info!("Storefront core listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
