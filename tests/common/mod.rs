#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use storefront_core::cache::ProductStockCache;
use storefront_core::domain::aggregates::{Product, StockStatus, Variant};
use storefront_core::domain::value_objects::{ProductId, UserId, VariantId};
use storefront_core::events::EventBus;
use storefront_core::services::CheckoutRequest;
use storefront_core::{Actor, CommerceSettings, MemoryStore, Services, Store};

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub events: EventBus,
    pub services: Services<MemoryStore>,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = ProductStockCache::new(Duration::from_secs(60));
        let events = EventBus::default().with_stock_cache(cache.clone());
        let services = Services::new(store.clone(), events.clone(), cache, CommerceSettings::default());
        store.insert_shipping_zone("inside_dhaka", "Inside Dhaka", money(500)).await;
        store.insert_shipping_zone("outside_dhaka", "Outside Dhaka", money(1200)).await;
        Self { store, events, services }
    }

    /// Single-variant product priced at `price` with `stock` units.
    pub async fn product(&self, price: Decimal, stock: i32) -> (ProductId, VariantId) {
        self.product_with(price, &[stock], StockStatus::InStock).await
    }

    pub async fn pre_order_product(&self, price: Decimal, stock: i32) -> (ProductId, VariantId) {
        self.product_with(price, &[stock], StockStatus::PreOrder).await
    }

    /// Product with one variant per stock entry; returns the first variant.
    pub async fn product_with(&self, price: Decimal, stocks: &[i32], stock_status: StockStatus) -> (ProductId, VariantId) {
        let product = build_product(price, stocks, stock_status);
        let ids = (product.id, product.variants[0].id);
        self.store.insert_product(product).await;
        ids
    }

    pub async fn stock_of(&self, variant_id: VariantId) -> i32 {
        let mut tx = self.store.begin().await.unwrap();
        self.store.get_variant(&mut tx, variant_id).await.unwrap().stock
    }
}

pub fn build_product(price: Decimal, stocks: &[i32], stock_status: StockStatus) -> Product {
    let id = ProductId::generate();
    let variants = stocks
        .iter()
        .enumerate()
        .map(|(i, stock)| Variant {
            id: VariantId::generate(),
            product_id: id,
            name: format!("Size {i}"),
            sku: None,
            stock: *stock,
            price: None,
            sale_price: None,
            low_stock_threshold: 1,
        })
        .collect();
    Product {
        id,
        name: "Cotton Panjabi".into(),
        slug: format!("cotton-panjabi-{id}"),
        base_price: price,
        sale_price: None,
        stock_status,
        is_active: true,
        variants,
    }
}

/// Amount in cents.
pub fn money(cents: i64) -> Decimal { Decimal::new(cents, 2) }

pub fn customer() -> Actor { Actor::new(UserId::generate()) }

pub fn cod_request() -> CheckoutRequest {
    CheckoutRequest { address: serde_json::json!({ "city": "Dhaka", "deliveryLocation": "inside_dhaka" }), ..Default::default() }
}

pub fn pre_order_request() -> CheckoutRequest {
    CheckoutRequest {
        payment_trx_id: Some("8N7A6SD2K1".into()),
        payment_provider: Some("bkash".into()),
        payment_phone: Some("01711000000".into()),
        ..cod_request()
    }
}
