//! Inventory ledger
//!
//! Every stock mutation in the crate goes through [`apply_stock_change`],
//! which wraps the store's conditional delta and raises the matching
//! events. The ledger service adds the admin entry points on top.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::Actor;
use crate::cache::ProductStockCache;
use crate::domain::aggregates::{InventoryLog, ProductStock, StockAdjustment, StockReason};
use crate::domain::events::{DomainEvent, InventoryEvent};
use crate::domain::value_objects::{ProductId, VariantId};
use crate::error::{CommerceError, ErrorKind, Result};
use crate::events::EventBus;
use crate::store::Store;

/// Apply a signed stock delta inside `tx` and queue the resulting events.
pub(crate) async fn apply_stock_change<S: Store>(
    store: &S,
    tx: &mut S::Tx,
    variant_id: VariantId,
    change: i32,
    reason: &StockReason,
    reference_id: &str,
    events: &mut Vec<DomainEvent>,
) -> Result<StockAdjustment> {
    let adjustment = store.adjust_stock(tx, variant_id, change, reason, reference_id).await?;

    events.push(DomainEvent::Inventory(InventoryEvent::StockAdjusted {
        product_id: adjustment.product_id,
        variant_id,
        change,
        new_stock: adjustment.new_stock,
        reason: reason.clone(),
    }));
    if adjustment.is_low_stock() {
        events.push(DomainEvent::Inventory(InventoryEvent::LowStock {
            product_id: adjustment.product_id,
            variant_id,
            stock: adjustment.new_stock,
            threshold: adjustment.low_stock_threshold,
        }));
    }
    Ok(adjustment)
}

#[derive(Clone, Debug, Serialize)]
pub struct InventoryLogPage {
    pub data: Vec<InventoryLog>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub struct InventoryLedger<S: Store> {
    store: Arc<S>,
    events: EventBus,
    cache: ProductStockCache,
}

impl<S: Store> Clone for InventoryLedger<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), events: self.events.clone(), cache: self.cache.clone() }
    }
}

impl<S: Store> InventoryLedger<S> {
    pub fn new(store: Arc<S>, events: EventBus, cache: ProductStockCache) -> Self {
        Self { store, events, cache }
    }

    /// Manual admin adjustment. The actor's id is the log's reference.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn adjust_stock(&self, variant_id: VariantId, change: i32, reason: StockReason, actor: &Actor) -> Result<StockAdjustment> {
        if change == 0 {
            return Err(CommerceError::validation("change amount must be non-zero"));
        }

        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let adjustment =
            match apply_stock_change(self.store.as_ref(), &mut tx, variant_id, change, &reason, &actor.user_id.to_string(), &mut events).await {
                Ok(adjustment) => adjustment,
                Err(e) => {
                    if e.kind() == ErrorKind::InsufficientStock {
                        warn!(%variant_id, change, "Stock adjustment rejected: would go negative");
                    }
                    return Err(e);
                }
            };
        self.store.commit(tx).await?;

        info!(%variant_id, change, new_stock = adjustment.new_stock, "Stock adjusted");
        self.events.publish_all(events).await;
        Ok(adjustment)
    }

    /// Newest first.
    pub async fn inventory_logs(&self, product_id: Option<ProductId>, limit: i64, offset: i64) -> Result<InventoryLogPage> {
        if limit <= 0 || offset < 0 {
            return Err(CommerceError::validation("limit must be positive and offset non-negative"));
        }
        let mut tx = self.store.begin().await?;
        let (data, total) = self.store.inventory_logs(&mut tx, product_id, limit, offset).await?;
        Ok(InventoryLogPage { data, total, limit, offset })
    }

    /// Storefront stock view, cached until the next adjustment of the product.
    pub async fn product_stock(&self, product_id: ProductId) -> Result<ProductStock> {
        if let Some(stock) = self.cache.get(product_id).await {
            return Ok(stock);
        }
        let mut tx = self.store.begin().await?;
        let product = self.store.get_product(&mut tx, product_id).await?;
        drop(tx);

        let stock = ProductStock::from(&product);
        self.cache.insert(stock.clone()).await;
        Ok(stock)
    }
}
