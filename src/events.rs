//! Event publishing
//!
//! Services collect [`DomainEvent`]s while a transaction is open and hand
//! them to [`EventBus::publish_all`] after commit. The bus fans out to
//! in-process subscribers, drops stale stock cache entries, and forwards to
//! NATS when a client is configured. Publishing never fails a request: the
//! state change is already durable by the time events go out.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::ProductStockCache;
use crate::domain::events::DomainEvent;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
    nats: Option<async_nats::Client>,
    subject_prefix: String,
    stock_cache: Option<ProductStockCache>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, nats: None, subject_prefix: "storefront".to_string(), stock_cache: None }
    }

    #[must_use]
    pub fn with_nats(mut self, client: async_nats::Client, subject_prefix: impl Into<String>) -> Self {
        self.nats = Some(client);
        self.subject_prefix = subject_prefix.into();
        self
    }

    #[must_use]
    pub fn with_stock_cache(mut self, cache: ProductStockCache) -> Self {
        self.stock_cache = Some(cache);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subject_for(&self, event: &DomainEvent) -> String {
        format!("{}.{}", self.subject_prefix, event.subject())
    }

    pub async fn publish(&self, event: DomainEvent) {
        if let (Some(cache), Some(product_id)) = (&self.stock_cache, event.invalidated_product()) {
            cache.invalidate(product_id).await;
        }

        if let Some(client) = &self.nats {
            let subject = self.subject_for(&event);
            match serde_json::to_vec(&event) {
                Ok(payload) => {
                    if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                        warn!(%subject, error = %e, "Failed to publish event to NATS");
                    }
                }
                Err(e) => warn!(%subject, error = %e, "Failed to serialize event"),
            }
        }

        // No subscribers is not an error.
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(receivers, "Event published");
    }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self { Self::new(256) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{ProductStock, StockReason};
    use crate::domain::events::InventoryEvent;
    use crate::domain::value_objects::{ProductId, VariantId};
    use std::time::Duration;

    #[tokio::test]
    async fn test_stock_adjusted_invalidates_cache_and_reaches_subscribers() {
        let cache = ProductStockCache::new(Duration::from_secs(60));
        let bus = EventBus::new(8).with_stock_cache(cache.clone());
        let mut rx = bus.subscribe();

        let product_id = ProductId::generate();
        cache.insert(ProductStock { product_id, total_stock: 3, is_pre_order: false, variants: vec![] }).await;

        bus.publish(DomainEvent::Inventory(InventoryEvent::StockAdjusted {
            product_id,
            variant_id: VariantId::generate(),
            change: -1,
            new_stock: 2,
            reason: StockReason::OrderPlaced,
        }))
        .await;

        assert!(cache.get(product_id).await.is_none());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.subject(), "inventory.stock_adjusted");
        assert_eq!(bus.subject_for(&received), "storefront.inventory.stock_adjusted");
    }
}
