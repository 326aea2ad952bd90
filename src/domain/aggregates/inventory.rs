//! Inventory log entries
//!
//! One append-only row per stock mutation. Replaying the signed
//! `change_amount` values of a variant reconstructs its stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{ProductId, VariantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLog {
    pub id: i64,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub change_amount: i32,
    pub reason: StockReason,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}

/// Why stock moved. Admin adjustments may carry free-form reasons.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StockReason {
    OrderPlaced,
    RefundRestock,
    Restock,
    Return,
    Adjustment,
    Cancelled,
    Other(String),
}

impl StockReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrderPlaced => "order_placed",
            Self::RefundRestock => "refund_restock",
            Self::Restock => "restock",
            Self::Return => "return",
            Self::Adjustment => "adjustment",
            Self::Cancelled => "cancelled",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for StockReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "order_placed" => Self::OrderPlaced,
            "refund_restock" => Self::RefundRestock,
            "restock" => Self::Restock,
            "return" => Self::Return,
            "adjustment" => Self::Adjustment,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<StockReason> for String {
    fn from(value: StockReason) -> Self { value.as_str().to_string() }
}

impl fmt::Display for StockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Result of one applied stock delta.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub change_amount: i32,
    pub new_stock: i32,
    pub low_stock_threshold: i32,
    pub log_id: i64,
}

impl StockAdjustment {
    pub fn is_low_stock(&self) -> bool { self.new_stock <= self.low_stock_threshold }
}

/// Storefront view of a product's stock, served from the stock cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: ProductId,
    pub total_stock: i64,
    pub is_pre_order: bool,
    pub variants: Vec<VariantStock>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStock {
    pub variant_id: VariantId,
    pub name: String,
    pub stock: i32,
    pub low_stock: bool,
}

impl From<&Product> for ProductStock {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            total_stock: product.total_stock(),
            is_pre_order: product.is_pre_order(),
            variants: product
                .variants
                .iter()
                .map(|v| VariantStock { variant_id: v.id, name: v.name.clone(), stock: v.stock, low_stock: v.is_low_stock() })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(StockReason::from("order_placed".to_string()), StockReason::OrderPlaced);
        assert_eq!(StockReason::RefundRestock.to_string(), "refund_restock");
        assert_eq!(StockReason::from("damaged in transit".to_string()), StockReason::Other("damaged in transit".into()));
    }
}
