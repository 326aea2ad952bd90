//! Storefront Core
//!
//! Backend for a single online store: carts, checkout, the order lifecycle
//! and a transactional inventory ledger.
//!
//! ## Features
//! - Atomic checkout: order, items, history, stock and cart clearing commit together
//! - Stock that never goes negative, with an append-only inventory log
//! - Forward-only order status transitions with an audit history
//! - Partial and full refunds, optionally restocking
//! - Pre-orders with a configurable deposit
//! - Domain events over NATS after commit

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod services;
pub mod store;

pub use config::{AppConfig, CommerceSettings};
pub use error::{CommerceError, ErrorKind, Result};
pub use services::{Actor, Services};
pub use store::{MemoryStore, PgStore, Store, StoreError};
