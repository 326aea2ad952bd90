//! Domain events
//!
//! Raised by the services and published only after the owning transaction
//! has committed.
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::{OrderStatus, PaymentStatus, StockReason};
use crate::domain::value_objects::{OrderId, ProductId, UserId, VariantId};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Inventory(InventoryEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, user_id: UserId, total: Decimal, is_pre_order: bool },
    StatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus, actor: UserId },
    PaymentStatusChanged { order_id: OrderId, from: PaymentStatus, to: PaymentStatus, actor: UserId },
    PaymentVerified { order_id: OrderId, actor: UserId },
    Refunded { order_id: OrderId, amount: Decimal, restocked: bool, actor: UserId },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    StockAdjusted { product_id: ProductId, variant_id: VariantId, change: i32, new_stock: i32, reason: StockReason },
    LowStock { product_id: ProductId, variant_id: VariantId, stock: i32, threshold: i32 },
}

impl DomainEvent {
    /// Subject suffix used when publishing, e.g. `order.placed`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            Self::Order(OrderEvent::PaymentStatusChanged { .. }) => "order.payment_status_changed",
            Self::Order(OrderEvent::PaymentVerified { .. }) => "order.payment_verified",
            Self::Order(OrderEvent::Refunded { .. }) => "order.refunded",
            Self::Inventory(InventoryEvent::StockAdjusted { .. }) => "inventory.stock_adjusted",
            Self::Inventory(InventoryEvent::LowStock { .. }) => "inventory.low_stock",
        }
    }

    /// Product whose cached stock aggregate this event invalidates.
    pub fn invalidated_product(&self) -> Option<ProductId> {
        match self {
            Self::Inventory(InventoryEvent::StockAdjusted { product_id, .. }) => Some(*product_id),
            _ => None,
        }
    }
}
