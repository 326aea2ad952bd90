//! Checkout orchestration
//!
//! Two phases. Pricing reads the cart and catalog and validates everything
//! without writing. Commit then runs in one transaction: it re-locks the
//! cart, creates the order and its first history row, decrements stock in
//! ascending variant order and clears the cart. Any failure drops the
//! transaction, which rolls back every earlier step of the same call.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::inventory::apply_stock_change;
use super::Actor;
use crate::config::CommerceSettings;
use crate::domain::aggregates::{
    CartItem, Order, OrderHistory, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, StockReason,
};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{OrderId, OrderItemId, ProductId, Quantity, UserId, VariantId};
use crate::error::{CommerceError, Result};
use crate::events::EventBus;
use crate::store::{Store, StoreError};

/// Address key naming the delivery zone.
const DELIVERY_ZONE_KEY: &str = "deliveryLocation";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address: serde_json::Value,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub payment_trx_id: Option<String>,
    pub payment_provider: Option<String>,
    pub payment_phone: Option<String>,
}

impl CheckoutRequest {
    fn delivery_zone<'a>(&'a self, default: &'a str) -> &'a str {
        self.address.get(DELIVERY_ZONE_KEY).and_then(serde_json::Value::as_str).unwrap_or(default)
    }

    /// Provider, transaction id and sender number, all non-blank.
    fn payment_proof(&self) -> Option<(String, String, String)> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Some((present(&self.payment_provider)?, present(&self.payment_trx_id)?, present(&self.payment_phone)?))
    }
}

/// One priced cart line.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PlannedLine {
    product_id: ProductId,
    variant_id: VariantId,
    quantity: Quantity,
    unit_price: Decimal,
}

pub struct CheckoutService<S: Store> {
    store: Arc<S>,
    events: EventBus,
    settings: CommerceSettings,
}

impl<S: Store> Clone for CheckoutService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), events: self.events.clone(), settings: self.settings.clone() }
    }
}

type LineKey = (ProductId, VariantId, Quantity);

fn sorted_keys(keys: impl Iterator<Item = LineKey>) -> Vec<LineKey> {
    let mut keys: Vec<_> = keys.collect();
    keys.sort();
    keys
}

fn cart_fingerprint(items: &[CartItem]) -> Vec<LineKey> {
    sorted_keys(items.iter().map(|i| (i.product_id, i.variant_id, i.quantity)))
}

impl<S: Store> CheckoutService<S> {
    pub fn new(store: Arc<S>, events: EventBus, settings: CommerceSettings) -> Self {
        Self { store, events, settings }
    }

    /// Turn the caller's cart into an order.
    #[instrument(skip(self, request), fields(user_id = %actor.user_id))]
    pub async fn checkout(&self, actor: &Actor, request: CheckoutRequest) -> Result<Order> {
        let mut order = self.price(actor.user_id, &request).await?;
        let planned = sorted_keys(order.items.iter().map(|i| (i.product_id, i.variant_id, i.quantity)));

        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;

        let cart = self.store.get_or_create_cart(&mut tx, actor.user_id).await?;
        self.store.lock_cart(&mut tx, cart.id).await?;
        let current = self.store.cart_items(&mut tx, actor.user_id).await?;
        if cart_fingerprint(&current) != planned {
            warn!(cart_id = %cart.id, "Cart changed while checking out");
            return Err(CommerceError::validation("cart changed during checkout, please review and retry"));
        }

        self.store.create_order(&mut tx, &mut order).await?;
        let placed = OrderHistory::entry(order.id, None, order.status.clone(), "Order placed", Some(actor.user_id));
        self.store.create_order_history(&mut tx, &placed).await?;

        // Ascending variant order keeps row-lock acquisition deterministic.
        let mut per_variant: BTreeMap<VariantId, i64> = BTreeMap::new();
        for item in &order.items {
            *per_variant.entry(item.variant_id).or_default() += i64::from(item.quantity.value());
        }
        let reference = order.id.to_string();
        for (variant_id, quantity) in per_variant {
            let change = i32::try_from(quantity).map_err(|_| CommerceError::validation("quantity overflow"))?;
            if let Err(e) =
                apply_stock_change(self.store.as_ref(), &mut tx, variant_id, -change, &StockReason::OrderPlaced, &reference, &mut events).await
            {
                warn!(order_id = %order.id, %variant_id, error = %e, "Checkout aborted, rolling back");
                return Err(e);
            }
        }

        self.store.clear_cart(&mut tx, cart.id).await?;
        self.store.commit(tx).await?;

        info!(order_id = %order.id, total = %order.total_amount, is_pre_order = order.is_pre_order, "Order placed");
        events.insert(
            0,
            DomainEvent::Order(OrderEvent::Placed {
                order_id: order.id,
                user_id: order.user_id,
                total: order.total_amount,
                is_pre_order: order.is_pre_order,
            }),
        );
        self.events.publish_all(events).await;
        Ok(order)
    }

    /// Validate and price the cart without writing anything.
    async fn price(&self, user_id: UserId, request: &CheckoutRequest) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let items = self.store.cart_items(&mut tx, user_id).await?;
        if items.is_empty() {
            return Err(CommerceError::CartEmpty);
        }

        let mut lines = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;
        let mut deposit_required = Decimal::ZERO;
        let mut is_pre_order = false;

        for item in &items {
            let product = self.store.get_product(&mut tx, item.product_id).await?;
            let variant = product.variant(item.variant_id).ok_or(CommerceError::VariantNotFound {
                product_id: product.id,
                variant_id: item.variant_id,
            })?;
            let unit_price = product.checkout_unit_price(variant);
            let item_total = unit_price * Decimal::from(item.quantity.value());
            subtotal += item_total;

            if product.is_pre_order() {
                is_pre_order = true;
                deposit_required += item_total * self.settings.preorder_deposit_ratio;
            }
            lines.push(PlannedLine { product_id: product.id, variant_id: variant.id, quantity: item.quantity, unit_price });
        }
        let deposit_required = deposit_required.round_dp(2);

        let zone_key = request.delivery_zone(&self.settings.default_delivery_zone);
        let zone = match self.store.shipping_zone_by_key(&mut tx, zone_key).await {
            Ok(zone) => zone,
            Err(StoreError::NotFound { .. }) => {
                warn!(zone = zone_key, "Shipping configuration not found");
                return Err(CommerceError::ShippingZoneNotFound(zone_key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        drop(tx);

        let shipping_fee = zone.cost;
        let total_amount = subtotal + shipping_fee;

        let (status, payment_status, paid_amount, payment_details) = if is_pre_order {
            let (provider, transaction_id, sender_number) = request.payment_proof().ok_or_else(|| {
                CommerceError::validation("pre-order items require partial payment info (transaction id, provider, phone)")
            })?;
            let details = PaymentDetails { provider, transaction_id, sender_number, deposit_required, shipping_fee };
            (OrderStatus::PendingVerification, PaymentStatus::PendingVerification, deposit_required, Some(details))
        } else {
            (OrderStatus::Pending, PaymentStatus::Pending, Decimal::ZERO, None)
        };

        let order_id = OrderId::generate();
        let now = chrono::Utc::now();
        Ok(Order {
            id: order_id,
            user_id,
            status,
            total_amount,
            shipping_fee,
            shipping_address: request.address.clone(),
            payment_method: request.payment_method,
            payment_status,
            paid_amount,
            refunded_amount: Decimal::ZERO,
            payment_details,
            is_pre_order,
            items: lines
                .into_iter()
                .map(|line| OrderItem {
                    id: OrderItemId::generate(),
                    order_id,
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_zone_from_address() {
        let request = CheckoutRequest { address: serde_json::json!({ "deliveryLocation": "outside_dhaka" }), ..Default::default() };
        assert_eq!(request.delivery_zone("inside_dhaka"), "outside_dhaka");
        let request = CheckoutRequest { address: serde_json::json!({ "city": "Dhaka" }), ..Default::default() };
        assert_eq!(request.delivery_zone("inside_dhaka"), "inside_dhaka");
    }

    #[test]
    fn test_payment_proof_requires_all_fields() {
        let mut request = CheckoutRequest {
            payment_trx_id: Some("TRX1".into()),
            payment_provider: Some("bkash".into()),
            payment_phone: Some("  ".into()),
            ..Default::default()
        };
        assert!(request.payment_proof().is_none());
        request.payment_phone = Some("01700000000".into());
        assert_eq!(
            request.payment_proof(),
            Some(("bkash".to_string(), "TRX1".to_string(), "01700000000".to_string()))
        );
    }
}
