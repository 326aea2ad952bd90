//! Order Aggregate
//!
//! An order is an immutable snapshot of a checkout plus a mutable lifecycle:
//! status, payment status, paid amount and refunded amount. Status moves
//! forward only, ranked by a progress weight; payment status is free-form.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::value_objects::{OrderHistoryId, OrderId, OrderItemId, ProductId, Quantity, RefundId, UserId, VariantId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_fee: Decimal,
    pub shipping_address: serde_json::Value,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub paid_amount: Decimal,
    pub refunded_amount: Decimal,
    pub payment_details: Option<PaymentDetails>,
    pub is_pre_order: bool,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: Quantity,
    /// Unit price at the time of purchase.
    pub price: Decimal,
}

/// Manual payment proof submitted with a pre-order checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub provider: String,
    pub transaction_id: String,
    pub sender_number: String,
    pub deposit_required: Decimal,
    pub shipping_fee: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistory {
    pub id: OrderHistoryId,
    pub order_id: OrderId,
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub reason: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl OrderHistory {
    pub fn entry(order_id: OrderId, previous_status: Option<OrderStatus>, new_status: OrderStatus, reason: impl Into<String>, created_by: Option<UserId>) -> Self {
        Self {
            id: OrderHistoryId::generate(), order_id, previous_status, new_status,
            reason: Some(reason.into()), created_by, created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: RefundId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub reason: String,
    pub restock: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Bkash,
    Nagad,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cod => "cod", Self::Bkash => "bkash", Self::Nagad => "nagad" }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value { "cod" => Some(Self::Cod), "bkash" => Some(Self::Bkash), "nagad" => Some(Self::Nagad), _ => None }
    }
}

/// Order status, ranked by progress weight.
///
/// `Unrecognized` carries values written outside this service; transitions
/// into or out of it are never validated so admins can correct bad data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    PendingVerification,
    Processing,
    Shipped,
    Delivered,
    Paid,
    Returned,
    Refunded,
    Cancelled,
    Fake,
    Unrecognized(String),
}

impl OrderStatus {
    pub const KNOWN: [OrderStatus; 10] = [
        Self::Pending, Self::PendingVerification, Self::Processing, Self::Shipped, Self::Delivered,
        Self::Paid, Self::Returned, Self::Refunded, Self::Cancelled, Self::Fake,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Paid => "paid",
            Self::Returned => "returned",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
            Self::Fake => "fake",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Rank used to forbid backward moves. Equal ranks are lateral moves.
    pub fn progress_weight(&self) -> Option<u8> {
        match self {
            Self::Pending | Self::PendingVerification => Some(10),
            Self::Processing => Some(20),
            Self::Shipped => Some(30),
            Self::Delivered => Some(40),
            Self::Paid => Some(50),
            Self::Returned => Some(60),
            Self::Refunded => Some(70),
            Self::Cancelled => Some(80),
            Self::Fake => Some(90),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        match (self.progress_weight(), next.progress_weight()) {
            (Some(current), Some(target)) => target >= current,
            _ => true,
        }
    }

    pub fn check_transition(&self, next: &OrderStatus) -> Result<(), OrderError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition { from: self.clone(), to: next.clone() })
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        Self::KNOWN.iter().find(|s| s.as_str() == value).cloned().unwrap_or(Self::Unrecognized(value))
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self { Self::from(value.to_string()) }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self { value.as_str().to_string() }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    PendingVerification,
    Paid,
    Failed,
    PartialPaid,
    PartialRefund,
    Refunded,
    Unrecognized(String),
}

impl PaymentStatus {
    pub const KNOWN: [PaymentStatus; 7] = [
        Self::Pending, Self::PendingVerification, Self::Paid, Self::Failed,
        Self::PartialPaid, Self::PartialRefund, Self::Refunded,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::PartialPaid => "partial_paid",
            Self::PartialRefund => "partial_refund",
            Self::Refunded => "refunded",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        Self::KNOWN.iter().find(|s| s.as_str() == value).cloned().unwrap_or(Self::Unrecognized(value))
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self { Self::from(value.to_string()) }
}

impl From<PaymentStatus> for String {
    fn from(value: PaymentStatus) -> Self { value.as_str().to_string() }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Outcome of validating a refund against an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundPlan {
    pub amount: Decimal,
    pub remaining_before: Decimal,
    /// Set when the refund restocks and clears the whole refundable balance
    /// and the status machine allows moving to `refunded`.
    pub next_status: Option<OrderStatus>,
}

impl Order {
    pub fn refundable_balance(&self) -> Decimal { self.paid_amount - self.refunded_amount }

    pub fn plan_refund(&self, amount: Decimal, restock: bool) -> Result<RefundPlan, OrderError> {
        if amount <= Decimal::ZERO {
            return Err(OrderError::NonPositiveRefund(amount));
        }
        let remaining = self.refundable_balance();
        if amount > remaining {
            return Err(OrderError::RefundExceedsRemaining { requested: amount, remaining });
        }
        let next_status = (restock && amount >= remaining && self.status.can_transition_to(&OrderStatus::Refunded))
            .then_some(OrderStatus::Refunded);
        Ok(RefundPlan { amount, remaining_before: remaining, next_status })
    }

    pub fn check_payment_verifiable(&self) -> Result<(), OrderError> {
        if !self.is_pre_order {
            return Err(OrderError::NotPreOrder);
        }
        if self.status != OrderStatus::PendingVerification {
            return Err(OrderError::InvalidTransition { from: self.status.clone(), to: OrderStatus::Processing });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("invalid transition: cannot go backward from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("refund amount must be positive, got {0}")]
    NonPositiveRefund(Decimal),
    #[error("cannot refund {requested} (max refundable: {remaining})")]
    RefundExceedsRemaining { requested: Decimal, remaining: Decimal },
    #[error("order is not a pre-order")]
    NotPreOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, paid: i64, refunded: i64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::generate(), user_id: UserId::generate(), status,
            total_amount: Decimal::new(100, 0), shipping_fee: Decimal::new(5, 0),
            shipping_address: serde_json::json!({}), payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending, paid_amount: Decimal::new(paid, 0),
            refunded_amount: Decimal::new(refunded, 0), payment_details: None, is_pre_order: false,
            items: vec![], created_at: now, updated_at: now,
        }
    }

    #[test]
    fn test_forward_moves_allowed() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(&OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Fake));
        assert!(OrderStatus::Delivered.can_transition_to(&OrderStatus::Delivered));
    }

    #[test]
    fn test_lateral_same_weight_allowed() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::PendingVerification));
        assert!(OrderStatus::PendingVerification.can_transition_to(&OrderStatus::Pending));
    }

    #[test]
    fn test_backward_moves_rejected() {
        let err = OrderStatus::Delivered.check_transition(&OrderStatus::Pending).unwrap_err();
        assert_eq!(err, OrderError::InvalidTransition { from: OrderStatus::Delivered, to: OrderStatus::Pending });
        assert!(!OrderStatus::Cancelled.can_transition_to(&OrderStatus::Refunded));
    }

    #[test]
    fn test_weights_are_monotonic_along_declaration_order() {
        let weights: Vec<u8> = OrderStatus::KNOWN.iter().filter_map(OrderStatus::progress_weight).collect();
        assert_eq!(weights.len(), OrderStatus::KNOWN.len());
        assert!(weights.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_unrecognized_passes_through() {
        let legacy = OrderStatus::from("on_hold");
        assert_eq!(legacy, OrderStatus::Unrecognized("on_hold".into()));
        assert!(legacy.can_transition_to(&OrderStatus::Pending));
        assert!(OrderStatus::Fake.can_transition_to(&legacy));
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in OrderStatus::KNOWN {
            assert_eq!(OrderStatus::from(status.to_string()), status);
        }
        assert_eq!(PaymentStatus::from("partial_paid"), PaymentStatus::PartialPaid);
        let json = serde_json::to_string(&OrderStatus::PendingVerification).unwrap();
        assert_eq!(json, "\"pending_verification\"");
    }

    #[test]
    fn test_refund_plan() {
        let o = order(OrderStatus::Delivered, 100, 40);
        assert_eq!(o.refundable_balance(), Decimal::new(60, 0));
        let err = o.plan_refund(Decimal::new(61, 0), true).unwrap_err();
        assert_eq!(err, OrderError::RefundExceedsRemaining { requested: Decimal::new(61, 0), remaining: Decimal::new(60, 0) });
        assert!(matches!(o.plan_refund(Decimal::ZERO, false), Err(OrderError::NonPositiveRefund(_))));

        let partial = o.plan_refund(Decimal::new(10, 0), true).unwrap();
        assert_eq!(partial.next_status, None);
        let full_no_restock = o.plan_refund(Decimal::new(60, 0), false).unwrap();
        assert_eq!(full_no_restock.next_status, None);
        let full = o.plan_refund(Decimal::new(60, 0), true).unwrap();
        assert_eq!(full.next_status, Some(OrderStatus::Refunded));
    }

    #[test]
    fn test_full_refund_of_cancelled_order_keeps_status() {
        let o = order(OrderStatus::Cancelled, 50, 0);
        let plan = o.plan_refund(Decimal::new(50, 0), true).unwrap();
        assert_eq!(plan.next_status, None);
    }

    #[test]
    fn test_payment_verification_guard() {
        let mut o = order(OrderStatus::PendingVerification, 0, 0);
        assert_eq!(o.check_payment_verifiable(), Err(OrderError::NotPreOrder));
        o.is_pre_order = true;
        assert!(o.check_payment_verifiable().is_ok());
        o.status = OrderStatus::Processing;
        assert!(matches!(o.check_payment_verifiable(), Err(OrderError::InvalidTransition { .. })));
    }
}
