//! Cart use cases
//!
//! Lines carry absolute quantities. A relative add locks the cart row,
//! reads the current line and writes `M + N`, so concurrent adds on one
//! cart serialize instead of losing an update.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::Actor;
use crate::domain::aggregates::{Cart, Product};
use crate::domain::value_objects::{ProductId, Quantity, VariantId};
use crate::error::{CommerceError, ErrorKind, Result};
use crate::store::Store;

pub struct CartService<S: Store> {
    store: Arc<S>,
    max_quantity: u32,
}

impl<S: Store> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), max_quantity: self.max_quantity }
    }
}

/// Pick the variant a cart line refers to.
fn resolve_variant(product: &Product, requested: Option<VariantId>) -> Result<VariantId> {
    match requested {
        Some(variant_id) => product
            .variant(variant_id)
            .map(|v| v.id)
            .ok_or(CommerceError::VariantNotFound { product_id: product.id, variant_id }),
        None if product.variants.is_empty() => Err(CommerceError::validation(format!(
            "product configuration error: {} has no variants",
            product.name
        ))),
        None => product
            .sole_variant()
            .map(|v| v.id)
            .ok_or(CommerceError::VariantRequired { product_id: product.id }),
    }
}

impl<S: Store> CartService<S> {
    pub fn new(store: Arc<S>, max_quantity: u32) -> Self { Self { store, max_quantity } }

    fn check_limit(&self, quantity: Quantity) -> Result<()> {
        if quantity.value() > self.max_quantity {
            return Err(CommerceError::validation(format!(
                "quantity {quantity} exceeds the limit of {} per item",
                self.max_quantity
            )));
        }
        Ok(())
    }

    /// The caller's cart, created on first access.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn get_my_cart(&self, actor: &Actor) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let cart = self.store.get_or_create_cart(&mut tx, actor.user_id).await?;
        let items = self.store.cart_items(&mut tx, actor.user_id).await?;
        self.store.commit(tx).await?;
        Ok(cart.with_items(items))
    }

    /// Add `quantity` units to the line, merging with an existing one.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn add_to_cart(&self, actor: &Actor, product_id: ProductId, variant_id: Option<VariantId>, quantity: i32) -> Result<Cart> {
        let add = Quantity::new(quantity)?;
        self.check_limit(add)?;

        let mut tx = self.store.begin().await?;
        let product = self.store.get_product(&mut tx, product_id).await?;
        let variant_id = resolve_variant(&product, variant_id)?;

        let cart = self.store.get_or_create_cart(&mut tx, actor.user_id).await?;
        self.store.lock_cart(&mut tx, cart.id).await?;
        let current = cart.clone().with_items(self.store.cart_items(&mut tx, actor.user_id).await?);

        let target = current
            .quantity_after_add(product_id, variant_id, add)
            .ok_or_else(|| CommerceError::validation("quantity overflow"))?;
        self.check_limit(target)?;

        let items = match self
            .store
            .upsert_cart_item_atomic(&mut tx, actor.user_id, cart.id, product_id, variant_id, target)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                let e = CommerceError::from(e);
                if e.kind() == ErrorKind::InsufficientStock {
                    warn!(%variant_id, quantity = target.value(), "Add to cart rejected: insufficient stock");
                }
                return Err(e);
            }
        };
        self.store.commit(tx).await?;

        info!(%product_id, %variant_id, quantity = target.value(), "Cart line updated");
        Ok(cart.with_items(items))
    }

    /// Set the line to an absolute quantity; zero or less removes it.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn update_cart_quantity(&self, actor: &Actor, product_id: ProductId, variant_id: Option<VariantId>, quantity: i32) -> Result<Cart> {
        if quantity <= 0 {
            let variant_id = variant_id.ok_or_else(|| CommerceError::validation("variant_id required to remove item"))?;
            return self.remove_from_cart(actor, product_id, variant_id).await;
        }
        let target = Quantity::new(quantity)?;
        self.check_limit(target)?;

        let mut tx = self.store.begin().await?;
        let product = self.store.get_product(&mut tx, product_id).await?;
        let variant_id = resolve_variant(&product, variant_id)?;

        let cart = self.store.get_or_create_cart(&mut tx, actor.user_id).await?;
        let items = self
            .store
            .upsert_cart_item_atomic(&mut tx, actor.user_id, cart.id, product_id, variant_id, target)
            .await?;
        self.store.commit(tx).await?;

        Ok(cart.with_items(items))
    }

    /// Idempotent; returns the remaining cart.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn remove_from_cart(&self, actor: &Actor, product_id: ProductId, variant_id: VariantId) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        self.store.remove_cart_item(&mut tx, actor.user_id, product_id, variant_id).await?;
        let cart = self.store.get_or_create_cart(&mut tx, actor.user_id).await?;
        let items = self.store.cart_items(&mut tx, actor.user_id).await?;
        self.store.commit(tx).await?;
        Ok(cart.with_items(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{StockStatus, Variant};
    use rust_decimal::Decimal;

    fn product(variant_count: usize) -> Product {
        let id = ProductId::generate();
        let variants = (0..variant_count)
            .map(|i| Variant {
                id: VariantId::generate(), product_id: id, name: format!("V{i}"), sku: None, stock: 3,
                price: None, sale_price: None, low_stock_threshold: 0,
            })
            .collect();
        Product {
            id, name: "Kurta".into(), slug: "kurta".into(), base_price: Decimal::new(10, 0), sale_price: None,
            stock_status: StockStatus::InStock, is_active: true, variants,
        }
    }

    #[test]
    fn test_sole_variant_is_auto_resolved() {
        let p = product(1);
        assert_eq!(resolve_variant(&p, None).unwrap(), p.variants[0].id);
    }

    #[test]
    fn test_multiple_variants_require_a_choice() {
        let p = product(2);
        let err = resolve_variant(&p, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VariantRequired);
        assert_eq!(resolve_variant(&p, Some(p.variants[1].id)).unwrap(), p.variants[1].id);
    }

    #[test]
    fn test_foreign_variant_is_not_found() {
        let p = product(2);
        let err = resolve_variant(&p, Some(VariantId::generate())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(resolve_variant(&product(0), None).unwrap_err().kind(), ErrorKind::Validation);
    }
}
