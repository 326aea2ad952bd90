//! Cart Aggregate
//!
//! A cart belongs to one user (or is a guest cart), is created lazily on first
//! access and is never deleted, only cleared. Lines are keyed by
//! `(product_id, variant_id)` and carry an absolute quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::ResolvedPrice;
use crate::domain::value_objects::{CartId, CartItemId, ProductId, Quantity, UserId, VariantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_id: VariantId,
    pub variant_name: String,
    pub quantity: Quantity,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
}

impl CartItem {
    pub fn resolved_price(&self) -> ResolvedPrice { ResolvedPrice { price: self.price, sale_price: self.sale_price } }
    pub fn line_total(&self) -> Decimal { self.resolved_price().unit_price() * Decimal::from(self.quantity.value()) }
    pub fn matches(&self, product_id: ProductId, variant_id: VariantId) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }
}

impl Cart {
    pub fn for_user(id: CartId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self { id, user_id: Some(user_id), items: vec![], created_at: now, updated_at: now }
    }

    pub fn with_items(mut self, items: Vec<CartItem>) -> Self { self.items = items; self }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item_count(&self) -> usize { self.items.len() }

    pub fn line(&self, product_id: ProductId, variant_id: VariantId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.matches(product_id, variant_id))
    }

    /// Absolute quantity a line reaches after adding `add` units to it.
    pub fn quantity_after_add(&self, product_id: ProductId, variant_id: VariantId, add: Quantity) -> Option<Quantity> {
        match self.line(product_id, variant_id) {
            Some(existing) => existing.quantity.checked_add(add),
            None => Some(add),
        }
    }

    pub fn subtotal(&self) -> Decimal { self.items.iter().map(CartItem::line_total).sum() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(cart: &Cart, product_id: ProductId, variant_id: VariantId, qty: i32, price: i64) -> CartItem {
        CartItem {
            id: CartItemId::generate(), cart_id: cart.id, product_id, product_name: "Widget".into(),
            variant_id, variant_name: "Default".into(), quantity: Quantity::new(qty).unwrap(),
            price: Decimal::new(price, 0), sale_price: None,
        }
    }

    #[test]
    fn test_cart_operations() {
        let cart = Cart::for_user(CartId::generate(), UserId::generate());
        let (p, v) = (ProductId::generate(), VariantId::generate());
        let line = item(&cart, p, v, 5, 10);
        let cart = cart.with_items(vec![line]);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal(), Decimal::new(50, 0));
        let merged = cart.quantity_after_add(p, v, Quantity::new(3).unwrap()).unwrap();
        assert_eq!(merged.value(), 8); // Merged
        let fresh = cart.quantity_after_add(p, VariantId::generate(), Quantity::new(2).unwrap()).unwrap();
        assert_eq!(fresh.value(), 2);
    }

    #[test]
    fn test_line_total_uses_sale_price() {
        let cart = Cart::for_user(CartId::generate(), UserId::generate());
        let mut line = item(&cart, ProductId::generate(), VariantId::generate(), 2, 100);
        line.sale_price = Some(Decimal::new(75, 0));
        assert_eq!(line.line_total(), Decimal::new(150, 0));
    }
}
