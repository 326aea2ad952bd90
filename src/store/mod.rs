//! Persistence contract for the storefront core.
//!
//! A [`Store`] hands out an owned transaction handle from [`Store::begin`].
//! Every repository call takes that handle by `&mut`, so all statements of a
//! use case share one unit of work. [`Store::commit`] commits; dropping a
//! handle without committing rolls everything back, which is also what
//! happens when a request future is cancelled by its deadline.
//!
//! # Stock invariant
//!
//! [`Store::adjust_stock`] is the only write path for variant stock. It is a
//! conditional delta (`stock + change >= 0`) applied together with its
//! inventory log row; callers never read-then-write stock.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::{
    Cart, CartItem, InventoryLog, Order, OrderHistory, OrderStatus, PaymentStatus, Product, Refund,
    ShippingZone, StockAdjustment, StockReason, Variant,
};
use crate::domain::value_objects::{CartId, OrderId, ProductId, Quantity, UserId, VariantId};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The conditional stock update matched no row.
    #[error("insufficient stock for variant {variant_id}")]
    InsufficientStock { variant_id: VariantId },

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Transaction handle. Rolls back on drop unless committed.
    type Tx: Send;

    async fn begin(&self) -> StoreResult<Self::Tx>;
    async fn commit(&self, tx: Self::Tx) -> StoreResult<()>;

    // ------------------------------------------------------------------
    // Catalog (read-only here)
    // ------------------------------------------------------------------

    async fn get_product(&self, tx: &mut Self::Tx, id: ProductId) -> StoreResult<Product>;
    async fn get_variant(&self, tx: &mut Self::Tx, id: VariantId) -> StoreResult<Variant>;
    async fn shipping_zone_by_key(&self, tx: &mut Self::Tx, key: &str) -> StoreResult<ShippingZone>;

    // ------------------------------------------------------------------
    // Inventory ledger
    // ------------------------------------------------------------------

    /// Apply `change` to the variant's stock iff the result stays
    /// non-negative, and append the matching inventory log row.
    async fn adjust_stock(
        &self,
        tx: &mut Self::Tx,
        variant_id: VariantId,
        change: i32,
        reason: &StockReason,
        reference_id: &str,
    ) -> StoreResult<StockAdjustment>;

    /// Newest first. `None` lists every product. Returns the page and the
    /// total row count.
    async fn inventory_logs(
        &self,
        tx: &mut Self::Tx,
        product_id: Option<ProductId>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<InventoryLog>, i64)>;

    // ------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------

    /// The user's cart without items, created on first access.
    async fn get_or_create_cart(&self, tx: &mut Self::Tx, user_id: UserId) -> StoreResult<Cart>;

    /// Serialize cart mutations: held until the transaction ends.
    async fn lock_cart(&self, tx: &mut Self::Tx, cart_id: CartId) -> StoreResult<()>;

    /// Lines of the user's cart with effective prices resolved.
    async fn cart_items(&self, tx: &mut Self::Tx, user_id: UserId) -> StoreResult<Vec<CartItem>>;

    /// Set the line's quantity to `quantity` if the variant has that much
    /// stock, merging with an existing line, and return the whole cart.
    async fn upsert_cart_item_atomic(
        &self,
        tx: &mut Self::Tx,
        user_id: UserId,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> StoreResult<Vec<CartItem>>;

    /// Idempotent.
    async fn remove_cart_item(&self, tx: &mut Self::Tx, user_id: UserId, product_id: ProductId, variant_id: VariantId) -> StoreResult<()>;

    async fn clear_cart(&self, tx: &mut Self::Tx, cart_id: CartId) -> StoreResult<()>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Persist the order and its items; fills in the timestamps.
    async fn create_order(&self, tx: &mut Self::Tx, order: &mut Order) -> StoreResult<()>;
    async fn get_order(&self, tx: &mut Self::Tx, id: OrderId) -> StoreResult<Order>;
    /// Like `get_order`, holding a row lock until the transaction ends.
    async fn lock_order(&self, tx: &mut Self::Tx, id: OrderId) -> StoreResult<Order>;
    /// Newest first.
    async fn orders_for_user(&self, tx: &mut Self::Tx, user_id: UserId) -> StoreResult<Vec<Order>>;
    async fn update_order_status(&self, tx: &mut Self::Tx, id: OrderId, status: &OrderStatus) -> StoreResult<()>;
    async fn update_payment_status(&self, tx: &mut Self::Tx, id: OrderId, status: &PaymentStatus) -> StoreResult<()>;
    async fn create_order_history(&self, tx: &mut Self::Tx, entry: &OrderHistory) -> StoreResult<()>;
    /// Oldest first.
    async fn order_history(&self, tx: &mut Self::Tx, id: OrderId) -> StoreResult<Vec<OrderHistory>>;
    /// Persist the refund and add its amount to the order's refunded amount.
    async fn create_refund(&self, tx: &mut Self::Tx, refund: &Refund) -> StoreResult<()>;
}
