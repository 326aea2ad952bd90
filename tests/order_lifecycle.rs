mod common;

use common::*;
use storefront_core::domain::aggregates::{Order, OrderStatus, PaymentStatus};
use storefront_core::domain::events::{DomainEvent, OrderEvent};
use storefront_core::domain::value_objects::OrderId;
use storefront_core::{Actor, ErrorKind};

async fn placed_order(h: &Harness, user: &Actor) -> Order {
    let (product, variant) = h.product(money(1000), 10).await;
    h.services.cart.add_to_cart(user, product, Some(variant), 1).await.unwrap();
    h.services.checkout.checkout(user, cod_request()).await.unwrap()
}

#[tokio::test]
async fn test_forward_moves_succeed_and_backward_moves_fail() {
    let h = Harness::new().await;
    let user = customer();
    let admin = customer();
    let order = placed_order(&h, &user).await;

    let shipped = h.services.orders.update_order_status(order.id, OrderStatus::Shipped, None, &admin).await.unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let cancelled = h
        .services
        .orders
        .update_order_status(order.id, OrderStatus::Cancelled, Some("customer asked".into()), &admin)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let err = h.services.orders.update_order_status(order.id, OrderStatus::Pending, None, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let history = h.services.orders.order_history(order.id).await.unwrap();
    let moves: Vec<_> = history.iter().map(|h| (h.previous_status.clone(), h.new_status.clone())).collect();
    assert_eq!(
        moves,
        vec![
            (None, OrderStatus::Pending),
            (Some(OrderStatus::Pending), OrderStatus::Shipped),
            (Some(OrderStatus::Shipped), OrderStatus::Cancelled),
        ]
    );
    assert_eq!(history[2].reason.as_deref(), Some("customer asked"));
    assert_eq!(history[2].created_by, Some(admin.user_id));
}

#[tokio::test]
async fn test_delivered_cannot_go_back_to_pending() {
    let h = Harness::new().await;
    let user = customer();
    let admin = customer();
    let order = placed_order(&h, &user).await;

    h.services.orders.update_order_status(order.id, OrderStatus::Delivered, None, &admin).await.unwrap();
    let err = h.services.orders.update_order_status(order.id, OrderStatus::Pending, None, &admin).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(h.services.orders.get_order(order.id).await.unwrap().status, OrderStatus::Delivered);
    assert_eq!(h.services.orders.order_history(order.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unrecognized_status_is_an_escape_hatch() {
    let h = Harness::new().await;
    let user = customer();
    let admin = customer();
    let order = placed_order(&h, &user).await;

    h.services.orders.update_order_status(order.id, OrderStatus::Delivered, None, &admin).await.unwrap();
    let legacy = OrderStatus::from("on_hold");
    h.services.orders.update_order_status(order.id, legacy.clone(), None, &admin).await.unwrap();
    let back = h.services.orders.update_order_status(order.id, OrderStatus::Processing, None, &admin).await.unwrap();
    assert_eq!(back.status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_status_change_leaves_stock_untouched() {
    let h = Harness::new().await;
    let user = customer();
    let (product, variant) = h.product(money(1000), 10).await;
    h.services.cart.add_to_cart(&user, product, Some(variant), 4).await.unwrap();
    let order = h.services.checkout.checkout(&user, cod_request()).await.unwrap();

    h.services.orders.update_order_status(order.id, OrderStatus::Cancelled, None, &customer()).await.unwrap();
    assert_eq!(h.stock_of(variant).await, 6);
}

#[tokio::test]
async fn test_payment_status_is_free_form_and_logged() {
    let h = Harness::new().await;
    let user = customer();
    let admin = customer();
    let order = placed_order(&h, &user).await;

    let paid = h.services.orders.update_payment_status(order.id, PaymentStatus::Paid, &admin).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    let back = h.services.orders.update_payment_status(order.id, PaymentStatus::Pending, &admin).await.unwrap();
    assert_eq!(back.payment_status, PaymentStatus::Pending);
    // Unchanged value writes nothing.
    h.services.orders.update_payment_status(order.id, PaymentStatus::Pending, &admin).await.unwrap();

    let history = h.services.orders.order_history(order.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].reason.as_deref(), Some("Payment status changed: pending -> paid"));
    assert_eq!(history[1].previous_status, Some(OrderStatus::Pending));
    assert_eq!(history[1].new_status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_verify_pre_order_payment() {
    let h = Harness::new().await;
    let user = customer();
    let admin = customer();
    let (product, _) = h.pre_order_product(money(2000), 10).await;
    h.services.cart.add_to_cart(&user, product, None, 1).await.unwrap();
    let order = h.services.checkout.checkout(&user, pre_order_request()).await.unwrap();

    let mut events = h.events.subscribe();
    let verified = h.services.orders.verify_order_payment(order.id, &admin).await.unwrap();
    assert_eq!(verified.status, OrderStatus::Processing);
    assert_eq!(verified.payment_status, PaymentStatus::PartialPaid);
    assert!(matches!(events.recv().await.unwrap(), DomainEvent::Order(OrderEvent::PaymentVerified { .. })));

    let stored = h.services.orders.get_order(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Processing);
    assert_eq!(stored.payment_status, PaymentStatus::PartialPaid);
    let history = h.services.orders.order_history(order.id).await.unwrap();
    assert_eq!(history.last().unwrap().reason.as_deref(), Some("Payment Verified"));

    // Only once.
    let err = h.services.orders.verify_order_payment(order.id, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_verify_rejects_regular_orders() {
    let h = Harness::new().await;
    let user = customer();
    let order = placed_order(&h, &user).await;
    let err = h.services.orders.verify_order_payment(order.id, &customer()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_my_orders_newest_first_and_scoped_to_user() {
    let h = Harness::new().await;
    let user = customer();
    let first = placed_order(&h, &user).await;
    let second = placed_order(&h, &user).await;
    placed_order(&h, &customer()).await;

    let orders = h.services.orders.my_orders(&user).await.unwrap();
    let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
    let h = Harness::new().await;
    let err = h.services.orders.get_order(OrderId::generate()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.services.orders.order_history(OrderId::generate()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
