//! Product Aggregate
//!
//! Products are maintained by the catalog admin; this core only reads them to
//! resolve variants and prices. Variant stock is the unit of truth for
//! inventory and is only ever changed through the inventory ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::value_objects::{ProductId, VariantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_status: StockStatus,
    pub is_active: bool,
    pub variants: Vec<Variant>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub low_stock_threshold: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    PreOrder,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::InStock => "in_stock", Self::OutOfStock => "out_of_stock", Self::PreOrder => "pre_order" }
    }

    /// Unknown column values are read as in-stock.
    pub fn parse(value: &str) -> Self {
        match value { "pre_order" => Self::PreOrder, "out_of_stock" => Self::OutOfStock, _ => Self::InStock }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Price pair shown on a cart line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
}

impl ResolvedPrice {
    /// Cart display resolution: each variant field overrides its product
    /// counterpart independently.
    pub fn for_display(base_price: Decimal, sale_price: Option<Decimal>, variant_price: Option<Decimal>, variant_sale_price: Option<Decimal>) -> Self {
        Self {
            price: variant_price.unwrap_or(base_price),
            sale_price: variant_sale_price.or(sale_price),
        }
    }

    /// What the customer pays per unit.
    pub fn unit_price(&self) -> Decimal { self.sale_price.unwrap_or(self.price) }
}

impl Product {
    pub fn is_pre_order(&self) -> bool { self.stock_status == StockStatus::PreOrder }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> { self.variants.iter().find(|v| v.id == id) }

    /// The variant a cart add resolves to when the client did not pick one.
    pub fn sole_variant(&self) -> Option<&Variant> {
        match self.variants.as_slice() { [only] => Some(only), _ => None }
    }

    /// Sum of variant stock, which is what storefront pages display.
    pub fn total_stock(&self) -> i64 { self.variants.iter().map(|v| i64::from(v.stock)).sum() }

    /// Price charged at checkout: product sale price or base price, then
    /// the variant price override, then the variant sale price override.
    pub fn checkout_unit_price(&self, variant: &Variant) -> Decimal {
        let mut price = self.sale_price.unwrap_or(self.base_price);
        if let Some(p) = variant.price { price = p; }
        if let Some(p) = variant.sale_price { price = p; }
        price
    }

    pub fn display_price(&self, variant: &Variant) -> ResolvedPrice {
        ResolvedPrice::for_display(self.base_price, self.sale_price, variant.price, variant.sale_price)
    }
}

impl Variant {
    pub fn is_low_stock(&self) -> bool { self.stock <= self.low_stock_threshold }
}
