//! Product stock cache
//!
//! Caches the storefront stock view per product using `moka`. Entries are
//! dropped when a `StockAdjusted` event for the product is published, so the
//! TTL only bounds staleness for writes made outside this process.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::domain::aggregates::ProductStock;
use crate::domain::value_objects::ProductId;

#[derive(Clone)]
pub struct ProductStockCache {
    cache: Cache<ProductId, ProductStock>,
}

impl ProductStockCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(10_000).time_to_live(ttl).build();
        Self { cache }
    }

    pub async fn get(&self, product_id: ProductId) -> Option<ProductStock> {
        let hit = self.cache.get(&product_id).await;
        if hit.is_some() {
            debug!(%product_id, "Cache hit for product stock");
        }
        hit
    }

    pub async fn insert(&self, stock: ProductStock) {
        self.cache.insert(stock.product_id, stock).await;
    }

    pub async fn invalidate(&self, product_id: ProductId) {
        self.cache.invalidate(&product_id).await;
    }
}
