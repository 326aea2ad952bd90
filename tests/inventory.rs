mod common;

use common::*;
use storefront_core::domain::aggregates::{StockReason, StockStatus};
use storefront_core::domain::events::{DomainEvent, InventoryEvent};
use storefront_core::domain::value_objects::{ProductId, VariantId};
use storefront_core::ErrorKind;

#[tokio::test]
async fn test_stock_never_goes_negative() {
    let h = Harness::new().await;
    let admin = customer();
    let (_, variant) = h.product(money(1000), 3).await;

    let err = h.services.inventory.adjust_stock(variant, -4, StockReason::Adjustment, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(h.stock_of(variant).await, 3);

    let adjustment = h.services.inventory.adjust_stock(variant, -3, StockReason::Adjustment, &admin).await.unwrap();
    assert_eq!(adjustment.new_stock, 0);
    assert_eq!(h.stock_of(variant).await, 0);
}

#[tokio::test]
async fn test_adjustment_validation() {
    let h = Harness::new().await;
    let admin = customer();
    let (_, variant) = h.product(money(1000), 3).await;

    let err = h.services.inventory.adjust_stock(variant, 0, StockReason::Restock, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = h.services.inventory.adjust_stock(VariantId::generate(), 5, StockReason::Restock, &admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_logs_newest_first_with_actor_reference() {
    let h = Harness::new().await;
    let admin = customer();
    let (product, variant) = h.product(money(1000), 3).await;
    let (other_product, other_variant) = h.product(money(1000), 3).await;

    h.services.inventory.adjust_stock(variant, 10, StockReason::Restock, &admin).await.unwrap();
    h.services.inventory.adjust_stock(other_variant, 1, StockReason::Restock, &admin).await.unwrap();
    h.services.inventory.adjust_stock(variant, -2, StockReason::from("damaged".to_string()), &admin).await.unwrap();

    let page = h.services.inventory.inventory_logs(Some(product), 20, 0).await.unwrap();
    assert_eq!(page.total, 2);
    let changes: Vec<_> = page.data.iter().map(|log| log.change_amount).collect();
    assert_eq!(changes, vec![-2, 10]);
    assert_eq!(page.data[0].reason, StockReason::Other("damaged".into()));
    assert_eq!(page.data[0].reference_id, admin.user_id.to_string());

    let all = h.services.inventory.inventory_logs(None, 2, 1).await.unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.data.len(), 2);
    assert_eq!(all.data[0].product_id, other_product);

    let err = h.services.inventory.inventory_logs(None, 0, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_product_stock_is_cached_until_adjusted() {
    let h = Harness::new().await;
    let admin = customer();
    let product = build_product(money(1000), &[4, 6], StockStatus::InStock);
    let (product_id, small) = (product.id, product.variants[0].id);
    h.store.insert_product(product).await;

    let stock = h.services.inventory.product_stock(product_id).await.unwrap();
    assert_eq!(stock.total_stock, 10);
    assert_eq!(stock.variants.len(), 2);

    h.services.inventory.adjust_stock(small, -4, StockReason::Adjustment, &admin).await.unwrap();
    let stock = h.services.inventory.product_stock(product_id).await.unwrap();
    assert_eq!(stock.total_stock, 6);
    assert!(stock.variants.iter().any(|v| v.variant_id == small && v.stock == 0 && v.low_stock));

    let err = h.services.inventory.product_stock(ProductId::generate()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_low_stock_event_follows_adjustment() {
    let h = Harness::new().await;
    let admin = customer();
    let (_, variant) = h.product(money(1000), 3).await;
    let mut events = h.events.subscribe();

    h.services.inventory.adjust_stock(variant, -2, StockReason::Adjustment, &admin).await.unwrap();

    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::Inventory(InventoryEvent::StockAdjusted { change: -2, new_stock: 1, .. })
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        DomainEvent::Inventory(InventoryEvent::LowStock { stock: 1, threshold: 1, .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decrements_never_oversell() {
    let h = Harness::new().await;
    let (_, variant) = h.product(money(1000), 5).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let ledger = h.services.inventory.clone();
            let admin = customer();
            tokio::spawn(async move { ledger.adjust_stock(variant, -1, StockReason::Adjustment, &admin).await })
        })
        .collect();
    let mut succeeded = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(h.stock_of(variant).await, 0);
}
