//! Use cases of the storefront core.
//!
//! Each service owns a handle to the [`Store`] and opens at most one
//! transaction per call. Events raised inside a transaction are published
//! only after it commits.

pub mod cart;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod refunds;

use std::sync::Arc;

use serde::Serialize;

use crate::cache::ProductStockCache;
use crate::config::CommerceSettings;
use crate::domain::value_objects::UserId;
use crate::events::EventBus;
use crate::store::Store;

pub use cart::CartService;
pub use checkout::{CheckoutRequest, CheckoutService};
pub use inventory::{InventoryLedger, InventoryLogPage};
pub use orders::OrderService;
pub use refunds::{RefundRequest, RefundService};

/// The authenticated caller of a use case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: UserId,
}

impl Actor {
    pub const fn new(user_id: UserId) -> Self { Self { user_id } }
}

/// All services wired over one store.
pub struct Services<S: Store> {
    pub inventory: InventoryLedger<S>,
    pub cart: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub orders: OrderService<S>,
    pub refunds: RefundService<S>,
}

impl<S: Store> Services<S> {
    pub fn new(store: Arc<S>, events: EventBus, stock_cache: ProductStockCache, settings: CommerceSettings) -> Self {
        Self {
            inventory: InventoryLedger::new(store.clone(), events.clone(), stock_cache),
            cart: CartService::new(store.clone(), settings.max_cart_quantity),
            checkout: CheckoutService::new(store.clone(), events.clone(), settings),
            orders: OrderService::new(store.clone(), events.clone()),
            refunds: RefundService::new(store, events),
        }
    }
}

impl<S: Store> Clone for Services<S> {
    fn clone(&self) -> Self {
        Self {
            inventory: self.inventory.clone(),
            cart: self.cart.clone(),
            checkout: self.checkout.clone(),
            orders: self.orders.clone(),
            refunds: self.refunds.clone(),
        }
    }
}
