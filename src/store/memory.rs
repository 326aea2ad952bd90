//! In-process store.
//!
//! Backs the integration tests and local runs without `DATABASE_URL`. The
//! whole state sits behind one `tokio::sync::Mutex`: a transaction owns the
//! guard for its lifetime plus a snapshot that is restored if the handle is
//! dropped without commit. Transactions are therefore fully serialized.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreError, StoreResult};
use crate::domain::aggregates::{
    Cart, CartItem, InventoryLog, Order, OrderHistory, OrderStatus, PaymentStatus, Product, Refund,
    ShippingZone, StockAdjustment, StockReason, Variant,
};
use crate::domain::value_objects::{CartId, CartItemId, OrderId, ProductId, Quantity, UserId, VariantId};

#[derive(Clone, Debug)]
struct StoredCartItem {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: Quantity,
}

#[derive(Clone, Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    variant_owner: HashMap<VariantId, ProductId>,
    shipping_zones: HashMap<String, ShippingZone>,
    carts: HashMap<CartId, Cart>,
    cart_by_user: HashMap<UserId, CartId>,
    cart_items: Vec<StoredCartItem>,
    orders: Vec<Order>,
    history: Vec<OrderHistory>,
    refunds: Vec<Refund>,
    inventory_logs: Vec<InventoryLog>,
}

impl MemoryState {
    fn variant(&self, id: VariantId) -> StoreResult<&Variant> {
        self.variant_owner
            .get(&id)
            .and_then(|product_id| self.products.get(product_id))
            .and_then(|product| product.variant(id))
            .ok_or_else(|| StoreError::not_found("variant", id))
    }

    fn variant_mut(&mut self, id: VariantId) -> StoreResult<&mut Variant> {
        let product_id = *self.variant_owner.get(&id).ok_or_else(|| StoreError::not_found("variant", id))?;
        self.products
            .get_mut(&product_id)
            .and_then(|product| product.variants.iter_mut().find(|v| v.id == id))
            .ok_or_else(|| StoreError::not_found("variant", id))
    }

    fn order_mut(&mut self, id: OrderId) -> StoreResult<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == id).ok_or_else(|| StoreError::not_found("order", id))
    }

    fn resolve_items(&self, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        let Some(cart_id) = self.cart_by_user.get(&user_id) else { return Ok(vec![]) };
        self.cart_items
            .iter()
            .filter(|row| row.cart_id == *cart_id)
            .map(|row| {
                let product = self.products.get(&row.product_id).ok_or_else(|| StoreError::not_found("product", row.product_id))?;
                let variant = product.variant(row.variant_id).ok_or_else(|| StoreError::not_found("variant", row.variant_id))?;
                let price = product.display_price(variant);
                Ok(CartItem {
                    id: row.id,
                    cart_id: row.cart_id,
                    product_id: row.product_id,
                    product_name: product.name.clone(),
                    variant_id: row.variant_id,
                    variant_name: variant.name.clone(),
                    quantity: row.quantity,
                    price: price.price,
                    sale_price: price.sale_price,
                })
            })
            .collect()
    }
}

/// Transaction over [`MemoryStore`]. Restores the snapshot on drop unless committed.
pub struct MemoryTx {
    state: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Seed a product with its variants.
    pub async fn insert_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        for variant in &product.variants {
            state.variant_owner.insert(variant.id, product.id);
        }
        state.products.insert(product.id, product);
    }

    /// Seed an active shipping zone.
    pub async fn insert_shipping_zone(&self, key: &str, label: &str, cost: Decimal) -> ShippingZone {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let zone = ShippingZone {
            id: i32::try_from(state.shipping_zones.len() + 1).unwrap_or(i32::MAX),
            key: key.to_string(),
            label: label.to_string(),
            cost,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.shipping_zones.insert(key.to_string(), zone.clone());
        zone
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let state = self.state.clone().lock_owned().await;
        let snapshot = state.clone();
        Ok(MemoryTx { state, snapshot: Some(snapshot) })
    }

    async fn commit(&self, mut tx: MemoryTx) -> StoreResult<()> {
        tx.snapshot = None;
        Ok(())
    }

    async fn get_product(&self, tx: &mut MemoryTx, id: ProductId) -> StoreResult<Product> {
        tx.state.products.get(&id).cloned().ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_variant(&self, tx: &mut MemoryTx, id: VariantId) -> StoreResult<Variant> {
        tx.state.variant(id).cloned()
    }

    async fn shipping_zone_by_key(&self, tx: &mut MemoryTx, key: &str) -> StoreResult<ShippingZone> {
        tx.state
            .shipping_zones
            .get(key)
            .filter(|zone| zone.is_active)
            .cloned()
            .ok_or_else(|| StoreError::not_found("shipping zone", key))
    }

    async fn adjust_stock(
        &self,
        tx: &mut MemoryTx,
        variant_id: VariantId,
        change: i32,
        reason: &StockReason,
        reference_id: &str,
    ) -> StoreResult<StockAdjustment> {
        let variant = tx.state.variant_mut(variant_id)?;
        let new_stock = i64::from(variant.stock) + i64::from(change);
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock { variant_id });
        }
        variant.stock = i32::try_from(new_stock).map_err(|_| StoreError::Corrupt(format!("stock overflow for variant {variant_id}")))?;
        let (product_id, new_stock, low_stock_threshold) = (variant.product_id, variant.stock, variant.low_stock_threshold);

        let log_id = i64::try_from(tx.state.inventory_logs.len()).unwrap_or(i64::MAX) + 1;
        tx.state.inventory_logs.push(InventoryLog {
            id: log_id,
            product_id,
            variant_id,
            change_amount: change,
            reason: reason.clone(),
            reference_id: reference_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(StockAdjustment { product_id, variant_id, change_amount: change, new_stock, low_stock_threshold, log_id })
    }

    async fn inventory_logs(
        &self,
        tx: &mut MemoryTx,
        product_id: Option<ProductId>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<InventoryLog>, i64)> {
        let matching: Vec<&InventoryLog> = tx
            .state
            .inventory_logs
            .iter()
            .rev()
            .filter(|log| product_id.map_or(true, |p| log.product_id == p))
            .collect();
        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_or_create_cart(&self, tx: &mut MemoryTx, user_id: UserId) -> StoreResult<Cart> {
        if let Some(cart) = tx.state.cart_by_user.get(&user_id).and_then(|id| tx.state.carts.get(id)) {
            return Ok(cart.clone());
        }
        let cart = Cart::for_user(CartId::generate(), user_id);
        tx.state.cart_by_user.insert(user_id, cart.id);
        tx.state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn lock_cart(&self, tx: &mut MemoryTx, cart_id: CartId) -> StoreResult<()> {
        // The transaction already holds the global lock.
        if tx.state.carts.contains_key(&cart_id) { Ok(()) } else { Err(StoreError::not_found("cart", cart_id)) }
    }

    async fn cart_items(&self, tx: &mut MemoryTx, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        tx.state.resolve_items(user_id)
    }

    async fn upsert_cart_item_atomic(
        &self,
        tx: &mut MemoryTx,
        user_id: UserId,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> StoreResult<Vec<CartItem>> {
        let owned = tx.state.carts.get(&cart_id).is_some_and(|cart| cart.user_id == Some(user_id));
        if !owned {
            return Err(StoreError::not_found("cart", cart_id));
        }
        let variant = tx.state.variant(variant_id)?;
        if variant.product_id != product_id {
            return Err(StoreError::not_found("variant", variant_id));
        }
        if i64::from(variant.stock) < i64::from(quantity.value()) {
            return Err(StoreError::InsufficientStock { variant_id });
        }

        match tx.state.cart_items.iter_mut().find(|row| row.cart_id == cart_id && row.product_id == product_id && row.variant_id == variant_id) {
            Some(row) => row.quantity = quantity,
            None => tx.state.cart_items.push(StoredCartItem { id: CartItemId::generate(), cart_id, product_id, variant_id, quantity }),
        }
        if let Some(cart) = tx.state.carts.get_mut(&cart_id) {
            cart.updated_at = Utc::now();
        }
        tx.state.resolve_items(user_id)
    }

    async fn remove_cart_item(&self, tx: &mut MemoryTx, user_id: UserId, product_id: ProductId, variant_id: VariantId) -> StoreResult<()> {
        if let Some(cart_id) = tx.state.cart_by_user.get(&user_id).copied() {
            tx.state
                .cart_items
                .retain(|row| !(row.cart_id == cart_id && row.product_id == product_id && row.variant_id == variant_id));
        }
        Ok(())
    }

    async fn clear_cart(&self, tx: &mut MemoryTx, cart_id: CartId) -> StoreResult<()> {
        tx.state.cart_items.retain(|row| row.cart_id != cart_id);
        Ok(())
    }

    async fn create_order(&self, tx: &mut MemoryTx, order: &mut Order) -> StoreResult<()> {
        let now = Utc::now();
        order.created_at = now;
        order.updated_at = now;
        tx.state.orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, tx: &mut MemoryTx, id: OrderId) -> StoreResult<Order> {
        tx.state.order_mut(id).map(|o| o.clone())
    }

    async fn lock_order(&self, tx: &mut MemoryTx, id: OrderId) -> StoreResult<Order> {
        self.get_order(tx, id).await
    }

    async fn orders_for_user(&self, tx: &mut MemoryTx, user_id: UserId) -> StoreResult<Vec<Order>> {
        Ok(tx.state.orders.iter().rev().filter(|o| o.user_id == user_id).cloned().collect())
    }

    async fn update_order_status(&self, tx: &mut MemoryTx, id: OrderId, status: &OrderStatus) -> StoreResult<()> {
        let order = tx.state.order_mut(id)?;
        order.status = status.clone();
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_payment_status(&self, tx: &mut MemoryTx, id: OrderId, status: &PaymentStatus) -> StoreResult<()> {
        let order = tx.state.order_mut(id)?;
        order.payment_status = status.clone();
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn create_order_history(&self, tx: &mut MemoryTx, entry: &OrderHistory) -> StoreResult<()> {
        tx.state.order_mut(entry.order_id)?;
        tx.state.history.push(entry.clone());
        Ok(())
    }

    async fn order_history(&self, tx: &mut MemoryTx, id: OrderId) -> StoreResult<Vec<OrderHistory>> {
        Ok(tx.state.history.iter().filter(|h| h.order_id == id).cloned().collect())
    }

    async fn create_refund(&self, tx: &mut MemoryTx, refund: &Refund) -> StoreResult<()> {
        let order = tx.state.order_mut(refund.order_id)?;
        order.refunded_amount += refund.amount;
        order.updated_at = Utc::now();
        tx.state.refunds.push(refund.clone());
        Ok(())
    }
}
