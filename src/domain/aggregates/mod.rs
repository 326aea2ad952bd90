//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod inventory;
pub mod shipping;

pub use product::{Product, ResolvedPrice, StockStatus, Variant};
pub use order::{Order, OrderError, OrderHistory, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, Refund, RefundPlan};
pub use cart::{Cart, CartItem};
pub use inventory::{InventoryLog, ProductStock, StockAdjustment, StockReason, VariantStock};
pub use shipping::ShippingZone;
