//! PostgreSQL-backed store
//!
//! Stock moves through one conditional `UPDATE ... WHERE stock + $2 >= 0`,
//! carts and orders are serialized with `SELECT ... FOR UPDATE`, and every
//! statement runs on the caller's transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::domain::aggregates::{
    Cart, CartItem, InventoryLog, Order, OrderHistory, OrderItem, OrderStatus, PaymentDetails,
    PaymentMethod, PaymentStatus, Product, Refund, ResolvedPrice, ShippingZone, StockAdjustment, StockReason,
    StockStatus, Variant,
};
use crate::domain::value_objects::{
    CartId, CartItemId, OrderHistoryId, OrderId, OrderItemId, ProductId, Quantity, UserId, VariantId,
};

type PgTx = Transaction<'static, Postgres>;

// ============================================================================
// Rows
// ============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    base_price: Decimal,
    sale_price: Option<Decimal>,
    stock_status: String,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    sku: Option<String>,
    stock: i32,
    price: Option<Decimal>,
    sale_price: Option<Decimal>,
    low_stock_threshold: i32,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: row.id.into(),
            product_id: row.product_id.into(),
            name: row.name,
            sku: row.sku,
            stock: row.stock,
            price: row.price,
            sale_price: row.sale_price,
            low_stock_threshold: row.low_stock_threshold,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShippingZoneRow {
    id: i32,
    key: String,
    label: String,
    cost: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShippingZoneRow> for ShippingZone {
    fn from(row: ShippingZoneRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            label: row.label,
            cost: row.cost,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id.into(),
            user_id: row.user_id.map(UserId::from),
            items: vec![],
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Cart line joined with its product and variant for price resolution.
#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    product_name: String,
    base_price: Decimal,
    product_sale_price: Option<Decimal>,
    variant_id: Uuid,
    variant_name: String,
    variant_price: Option<Decimal>,
    variant_sale_price: Option<Decimal>,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> StoreResult<Self> {
        let quantity = Quantity::new(row.quantity)
            .map_err(|e| StoreError::Corrupt(format!("cart item {}: {e}", row.id)))?;
        let price = ResolvedPrice::for_display(
            row.base_price,
            row.product_sale_price,
            row.variant_price,
            row.variant_sale_price,
        );
        Ok(Self {
            id: CartItemId::from(row.id),
            cart_id: row.cart_id.into(),
            product_id: row.product_id.into(),
            product_name: row.product_name,
            variant_id: row.variant_id.into(),
            variant_name: row.variant_name,
            quantity,
            price: price.price,
            sale_price: price.sale_price,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    total_amount: Decimal,
    shipping_fee: Decimal,
    shipping_address: serde_json::Value,
    payment_method: String,
    payment_status: String,
    paid_amount: Decimal,
    refunded_amount: Decimal,
    payment_details: Option<serde_json::Value>,
    is_pre_order: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or_else(|| StoreError::Corrupt(format!("order {}: unknown payment method '{}'", self.id, self.payment_method)))?;
        let payment_details = self
            .payment_details
            .map(serde_json::from_value::<PaymentDetails>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("order {}: payment details: {e}", self.id)))?;
        Ok(Order {
            id: self.id.into(),
            user_id: self.user_id.into(),
            status: OrderStatus::from(self.status),
            total_amount: self.total_amount,
            shipping_fee: self.shipping_fee,
            shipping_address: self.shipping_address,
            payment_method,
            payment_status: PaymentStatus::from(self.payment_status),
            paid_amount: self.paid_amount,
            refunded_amount: self.refunded_amount,
            payment_details,
            is_pre_order: self.is_pre_order,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    variant_id: Uuid,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> StoreResult<Self> {
        let quantity = Quantity::new(row.quantity)
            .map_err(|e| StoreError::Corrupt(format!("order item {}: {e}", row.id)))?;
        Ok(Self {
            id: OrderItemId::from(row.id),
            order_id: row.order_id.into(),
            product_id: row.product_id.into(),
            variant_id: row.variant_id.into(),
            quantity,
            price: row.price,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderHistoryRow {
    id: Uuid,
    order_id: Uuid,
    previous_status: Option<String>,
    new_status: String,
    reason: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<OrderHistoryRow> for OrderHistory {
    fn from(row: OrderHistoryRow) -> Self {
        Self {
            id: OrderHistoryId::from(row.id),
            order_id: row.order_id.into(),
            previous_status: row.previous_status.map(OrderStatus::from),
            new_status: OrderStatus::from(row.new_status),
            reason: row.reason,
            created_by: row.created_by.map(UserId::from),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InventoryLogRow {
    id: i64,
    product_id: Uuid,
    variant_id: Uuid,
    change_amount: i32,
    reason: String,
    reference_id: String,
    created_at: DateTime<Utc>,
}

impl From<InventoryLogRow> for InventoryLog {
    fn from(row: InventoryLogRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id.into(),
            variant_id: row.variant_id.into(),
            change_amount: row.change_amount,
            reason: StockReason::from(row.reason),
            reference_id: row.reference_id,
            created_at: row.created_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, user_id, status, total_amount, shipping_fee, shipping_address, payment_method, \
     payment_status, paid_amount, refunded_amount, payment_details, is_pre_order, created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, product_id, name, sku, stock, price, sale_price, low_stock_threshold";

// ============================================================================
// Store
// ============================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn items_for_orders(tx: &mut PgTx, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, variant_id, quantity, price FROM order_items \
             WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(order_ids)
        .fetch_all(&mut **tx)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(OrderItem::try_from(row)?);
        }
        Ok(grouped)
    }

    async fn load_order(tx: &mut PgTx, id: OrderId, for_update: bool) -> StoreResult<Order> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::not_found("order", id))?;
        let mut items = Self::items_for_orders(tx, &[row.id]).await?;
        let own = items.remove(&row.id).unwrap_or_default();
        row.into_order(own)
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: PgTx) -> StoreResult<()> {
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, tx), fields(product_id = %id))]
    async fn get_product(&self, tx: &mut PgTx, id: ProductId) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, slug, base_price, sale_price, stock_status, is_active FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::not_found("product", id))?;

        let variants = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = $1 ORDER BY created_at, id"
        ))
        .bind(id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(Product {
            id: row.id.into(),
            name: row.name,
            slug: row.slug,
            base_price: row.base_price,
            sale_price: row.sale_price,
            stock_status: StockStatus::parse(&row.stock_status),
            is_active: row.is_active,
            variants: variants.into_iter().map(Variant::from).collect(),
        })
    }

    async fn get_variant(&self, tx: &mut PgTx, id: VariantId) -> StoreResult<Variant> {
        sqlx::query_as::<_, VariantRow>(&format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .map(Variant::from)
            .ok_or_else(|| StoreError::not_found("variant", id))
    }

    async fn shipping_zone_by_key(&self, tx: &mut PgTx, key: &str) -> StoreResult<ShippingZone> {
        sqlx::query_as::<_, ShippingZoneRow>(
            "SELECT id, key, label, cost, is_active, created_at, updated_at FROM shipping_zones \
             WHERE key = $1 AND is_active = TRUE",
        )
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?
        .map(ShippingZone::from)
        .ok_or_else(|| StoreError::not_found("shipping zone", key))
    }

    #[instrument(skip(self, tx), fields(variant_id = %variant_id, reason = %reason))]
    async fn adjust_stock(
        &self,
        tx: &mut PgTx,
        variant_id: VariantId,
        change: i32,
        reason: &StockReason,
        reference_id: &str,
    ) -> StoreResult<StockAdjustment> {
        let updated: Option<(Uuid, i32, i32)> = sqlx::query_as(
            "UPDATE product_variants SET stock = stock + $2, updated_at = NOW() \
             WHERE id = $1 AND stock + $2 >= 0 \
             RETURNING product_id, stock, low_stock_threshold",
        )
        .bind(variant_id)
        .bind(change)
        .fetch_optional(&mut **tx)
        .await?;

        let Some((product_id, new_stock, low_stock_threshold)) = updated else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM product_variants WHERE id = $1)")
                .bind(variant_id)
                .fetch_one(&mut **tx)
                .await?;
            return Err(if exists {
                StoreError::InsufficientStock { variant_id }
            } else {
                StoreError::not_found("variant", variant_id)
            });
        };

        let log_id: i64 = sqlx::query_scalar(
            "INSERT INTO inventory_logs (product_id, variant_id, change_amount, reason, reference_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(product_id)
        .bind(variant_id)
        .bind(change)
        .bind(reason.as_str())
        .bind(reference_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(StockAdjustment {
            product_id: product_id.into(),
            variant_id,
            change_amount: change,
            new_stock,
            low_stock_threshold,
            log_id,
        })
    }

    async fn inventory_logs(
        &self,
        tx: &mut PgTx,
        product_id: Option<ProductId>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<InventoryLog>, i64)> {
        let rows = sqlx::query_as::<_, InventoryLogRow>(
            "SELECT id, product_id, variant_id, change_amount, reason, reference_id, created_at \
             FROM inventory_logs WHERE ($1::uuid IS NULL OR product_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut **tx)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_logs WHERE ($1::uuid IS NULL OR product_id = $1)")
            .bind(product_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok((rows.into_iter().map(InventoryLog::from).collect(), total))
    }

    async fn get_or_create_cart(&self, tx: &mut PgTx, user_id: UserId) -> StoreResult<Cart> {
        sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(CartId::generate())
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        let row = sqlx::query_as::<_, CartRow>("SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(Cart::from(row))
    }

    async fn lock_cart(&self, tx: &mut PgTx, cart_id: CartId) -> StoreResult<()> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
            .bind(cart_id)
            .fetch_optional(&mut **tx)
            .await?
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("cart", cart_id))
    }

    async fn cart_items(&self, tx: &mut PgTx, user_id: UserId) -> StoreResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT ci.id, ci.cart_id, ci.product_id, p.name AS product_name, p.base_price, \
                    p.sale_price AS product_sale_price, ci.variant_id, v.name AS variant_name, \
                    v.price AS variant_price, v.sale_price AS variant_sale_price, ci.quantity \
             FROM cart_items ci \
             JOIN carts c ON c.id = ci.cart_id \
             JOIN products p ON p.id = ci.product_id \
             JOIN product_variants v ON v.id = ci.variant_id \
             WHERE c.user_id = $1 \
             ORDER BY ci.created_at, ci.id",
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    #[instrument(skip(self, tx), fields(cart_id = %cart_id, variant_id = %variant_id, quantity = quantity.value()))]
    async fn upsert_cart_item_atomic(
        &self,
        tx: &mut PgTx,
        user_id: UserId,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> StoreResult<Vec<CartItem>> {
        let upserted: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO cart_items (id, cart_id, product_id, variant_id, quantity) \
             SELECT $1, c.id, v.product_id, v.id, $5 \
             FROM carts c \
             JOIN product_variants v ON v.id = $4 AND v.product_id = $3 \
             WHERE c.id = $2 AND c.user_id = $6 AND v.stock >= $5 \
             ON CONFLICT (cart_id, product_id, variant_id) \
             DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW() \
             RETURNING id",
        )
        .bind(CartItemId::generate())
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity.as_i32())
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        if upserted.is_none() {
            let owned: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM carts WHERE id = $1 AND user_id = $2)")
                .bind(cart_id)
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
            if !owned {
                return Err(StoreError::not_found("cart", cart_id));
            }
            let variant_matches: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM product_variants WHERE id = $1 AND product_id = $2)")
                    .bind(variant_id)
                    .bind(product_id)
                    .fetch_one(&mut **tx)
                    .await?;
            return Err(if variant_matches {
                StoreError::InsufficientStock { variant_id }
            } else {
                StoreError::not_found("variant", variant_id)
            });
        }

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut **tx)
            .await?;

        self.cart_items(tx, user_id).await
    }

    async fn remove_cart_item(&self, tx: &mut PgTx, user_id: UserId, product_id: ProductId, variant_id: VariantId) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM cart_items ci USING carts c \
             WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = $2 AND ci.variant_id = $3",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn clear_cart(&self, tx: &mut PgTx, cart_id: CartId) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, tx, order), fields(order_id = %order.id, items = order.items.len()))]
    async fn create_order(&self, tx: &mut PgTx, order: &mut Order) -> StoreResult<()> {
        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO orders (id, user_id, status, total_amount, shipping_fee, shipping_address, \
                 payment_method, payment_status, paid_amount, refunded_amount, payment_details, is_pre_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING created_at, updated_at",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.shipping_fee)
        .bind(&order.shipping_address)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.paid_amount)
        .bind(order.refunded_amount)
        .bind(order.payment_details.as_ref().map(Json))
        .bind(order.is_pre_order)
        .fetch_one(&mut **tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, variant_id, quantity, price) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(item.quantity.as_i32())
            .bind(item.price)
            .execute(&mut **tx)
            .await?;
        }

        order.created_at = created_at;
        order.updated_at = updated_at;
        Ok(())
    }

    async fn get_order(&self, tx: &mut PgTx, id: OrderId) -> StoreResult<Order> {
        Self::load_order(tx, id, false).await
    }

    async fn lock_order(&self, tx: &mut PgTx, id: OrderId) -> StoreResult<Order> {
        Self::load_order(tx, id, true).await
    }

    async fn orders_for_user(&self, tx: &mut PgTx, user_id: UserId) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = Self::items_for_orders(tx, &ids).await?;
        rows.into_iter()
            .map(|row| {
                let own = items.remove(&row.id).unwrap_or_default();
                row.into_order(own)
            })
            .collect()
    }

    async fn update_order_status(&self, tx: &mut PgTx, id: OrderId, status: &OrderStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    async fn update_payment_status(&self, tx: &mut PgTx, id: OrderId, status: &PaymentStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    async fn create_order_history(&self, tx: &mut PgTx, entry: &OrderHistory) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO order_history (id, order_id, previous_status, new_status, reason, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.order_id)
        .bind(entry.previous_status.as_ref().map(OrderStatus::as_str))
        .bind(entry.new_status.as_str())
        .bind(entry.reason.as_deref())
        .bind(entry.created_by)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn order_history(&self, tx: &mut PgTx, id: OrderId) -> StoreResult<Vec<OrderHistory>> {
        let rows = sqlx::query_as::<_, OrderHistoryRow>(
            "SELECT id, order_id, previous_status, new_status, reason, created_by, created_at \
             FROM order_history WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(OrderHistory::from).collect())
    }

    #[instrument(skip(self, tx, refund), fields(order_id = %refund.order_id, amount = %refund.amount))]
    async fn create_refund(&self, tx: &mut PgTx, refund: &Refund) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO refunds (id, order_id, amount, reason, restock, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(refund.id)
        .bind(refund.order_id)
        .bind(refund.amount)
        .bind(&refund.reason)
        .bind(refund.restock)
        .bind(refund.created_by)
        .bind(refund.created_at)
        .execute(&mut **tx)
        .await?;

        let result = sqlx::query("UPDATE orders SET refunded_amount = refunded_amount + $2, updated_at = NOW() WHERE id = $1")
            .bind(refund.order_id)
            .bind(refund.amount)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", refund.order_id));
        }
        Ok(())
    }
}
