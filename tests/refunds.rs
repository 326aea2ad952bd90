mod common;

use common::*;
use storefront_core::domain::aggregates::{Order, OrderStatus, StockReason};
use storefront_core::domain::events::{DomainEvent, InventoryEvent, OrderEvent};
use storefront_core::domain::value_objects::VariantId;
use storefront_core::services::RefundRequest;
use storefront_core::ErrorKind;

/// Pre-order of 3 x 20.00 with a 30.00 deposit collected.
async fn paid_pre_order(h: &Harness) -> (Order, VariantId) {
    let user = customer();
    let (product, variant) = h.pre_order_product(money(2000), 10).await;
    h.services.cart.add_to_cart(&user, product, Some(variant), 3).await.unwrap();
    let order = h.services.checkout.checkout(&user, pre_order_request()).await.unwrap();
    (order, variant)
}

fn refund(amount: i64, restock: bool) -> RefundRequest {
    RefundRequest { amount: money(amount), reason: "Damaged in transit".into(), restock }
}

#[tokio::test]
async fn test_refund_above_remaining_balance_is_rejected() {
    let h = Harness::new().await;
    let admin = customer();
    let (order, variant) = paid_pre_order(&h).await;

    let err = h.services.refunds.process_refund(order.id, refund(3001, true), &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RefundExceedsRemaining);

    h.services.refunds.process_refund(order.id, refund(2000, false), &admin).await.unwrap();
    let err = h.services.refunds.process_refund(order.id, refund(1001, false), &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RefundExceedsRemaining);

    let stored = h.services.orders.get_order(order.id).await.unwrap();
    assert_eq!(stored.refunded_amount, money(2000));
    assert_eq!(h.stock_of(variant).await, 7);
}

#[tokio::test]
async fn test_full_restocking_refund_restocks_and_moves_to_refunded() {
    let h = Harness::new().await;
    let admin = customer();
    let (order, variant) = paid_pre_order(&h).await;
    assert_eq!(h.stock_of(variant).await, 7);

    let mut events = h.events.subscribe();
    let refunded = h.services.refunds.process_refund(order.id, refund(3000, true), &admin).await.unwrap();

    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert_eq!(refunded.refunded_amount, money(3000));
    assert_eq!(h.stock_of(variant).await, 10);

    let history = h.services.orders.order_history(order.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.previous_status, Some(OrderStatus::PendingVerification));
    assert_eq!(last.new_status, OrderStatus::Refunded);
    assert_eq!(last.reason.as_deref(), Some("Refunded 30.00: Damaged in transit"));

    let logs = h.services.inventory.inventory_logs(None, 1, 0).await.unwrap();
    assert_eq!(logs.data[0].reason, StockReason::RefundRestock);
    assert_eq!(logs.data[0].change_amount, 3);

    assert!(matches!(events.recv().await.unwrap(), DomainEvent::Order(OrderEvent::Refunded { restocked: true, .. })));
    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::Inventory(InventoryEvent::StockAdjusted { change: 3, .. })
    ));
}

#[tokio::test]
async fn test_partial_refund_keeps_status() {
    let h = Harness::new().await;
    let admin = customer();
    let (order, variant) = paid_pre_order(&h).await;

    let updated = h.services.refunds.process_refund(order.id, refund(1000, true), &admin).await.unwrap();
    assert_eq!(updated.status, OrderStatus::PendingVerification);
    assert_eq!(h.stock_of(variant).await, 10);
}

#[tokio::test]
async fn test_full_refund_without_restock_keeps_status() {
    let h = Harness::new().await;
    let admin = customer();
    let (order, variant) = paid_pre_order(&h).await;

    let updated = h.services.refunds.process_refund(order.id, refund(3000, false), &admin).await.unwrap();
    assert_eq!(updated.status, OrderStatus::PendingVerification);
    assert_eq!(h.stock_of(variant).await, 7);
}

#[tokio::test]
async fn test_refund_on_unpaid_order_is_rejected() {
    let h = Harness::new().await;
    let user = customer();
    let (product, _) = h.product(money(1000), 10).await;
    h.services.cart.add_to_cart(&user, product, None, 1).await.unwrap();
    let order = h.services.checkout.checkout(&user, cod_request()).await.unwrap();

    let err = h.services.refunds.process_refund(order.id, refund(100, false), &customer()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RefundExceedsRemaining);
}

#[tokio::test]
async fn test_non_positive_refund_is_rejected() {
    let h = Harness::new().await;
    let (order, _) = paid_pre_order(&h).await;
    let err = h.services.refunds.process_refund(order.id, refund(0, false), &customer()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
