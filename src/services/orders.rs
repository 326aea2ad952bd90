//! Order lifecycle
//!
//! Status changes go through the forward-only table on [`OrderStatus`];
//! payment status is free-form. Every accepted change writes one history
//! row in the same transaction. Status changes have no stock or payment
//! side effects; those are explicit operations of their own.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::Actor;
use crate::domain::aggregates::{Order, OrderHistory, OrderStatus, PaymentStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::OrderId;
use crate::error::Result;
use crate::events::EventBus;
use crate::store::Store;

pub struct OrderService<S: Store> {
    store: Arc<S>,
    events: EventBus,
}

impl<S: Store> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), events: self.events.clone() }
    }
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>, events: EventBus) -> Self { Self { store, events } }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        Ok(self.store.get_order(&mut tx, order_id).await?)
    }

    /// Newest first.
    pub async fn my_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;
        Ok(self.store.orders_for_user(&mut tx, actor.user_id).await?)
    }

    /// Oldest first.
    pub async fn order_history(&self, order_id: OrderId) -> Result<Vec<OrderHistory>> {
        let mut tx = self.store.begin().await?;
        self.store.get_order(&mut tx, order_id).await?;
        Ok(self.store.order_history(&mut tx, order_id).await?)
    }

    #[instrument(skip(self, note, actor), fields(actor = %actor.user_id, to = %new_status))]
    pub async fn update_order_status(&self, order_id: OrderId, new_status: OrderStatus, note: Option<String>, actor: &Actor) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = self.store.lock_order(&mut tx, order_id).await?;
        let previous = order.status.clone();

        if let Err(e) = previous.check_transition(&new_status) {
            warn!(%order_id, from = %previous, "Status transition rejected");
            return Err(e.into());
        }

        self.store.update_order_status(&mut tx, order_id, &new_status).await?;
        let reason = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("System: Status changed from {previous} to {new_status}"));
        let entry = OrderHistory::entry(order_id, Some(previous.clone()), new_status.clone(), reason, Some(actor.user_id));
        self.store.create_order_history(&mut tx, &entry).await?;
        self.store.commit(tx).await?;

        info!(%order_id, from = %previous, "Order status updated");
        order.status = new_status.clone();
        self.events
            .publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id, from: previous, to: new_status, actor: actor.user_id }))
            .await;
        Ok(order)
    }

    /// Any payment status may follow any other; an unchanged value is a no-op.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn update_payment_status(&self, order_id: OrderId, new_status: PaymentStatus, actor: &Actor) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = self.store.lock_order(&mut tx, order_id).await?;
        let previous = order.payment_status.clone();
        if previous == new_status {
            return Ok(order);
        }

        self.store.update_payment_status(&mut tx, order_id, &new_status).await?;
        let entry = OrderHistory::entry(
            order_id,
            Some(order.status.clone()),
            order.status.clone(),
            format!("Payment status changed: {previous} -> {new_status}"),
            Some(actor.user_id),
        );
        self.store.create_order_history(&mut tx, &entry).await?;
        self.store.commit(tx).await?;

        info!(%order_id, from = %previous, to = %new_status, "Payment status updated");
        order.payment_status = new_status.clone();
        self.events
            .publish(DomainEvent::Order(OrderEvent::PaymentStatusChanged { order_id, from: previous, to: new_status, actor: actor.user_id }))
            .await;
        Ok(order)
    }

    /// Accept the manual deposit of a pre-order awaiting verification.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn verify_order_payment(&self, order_id: OrderId, actor: &Actor) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = self.store.lock_order(&mut tx, order_id).await?;
        if let Err(e) = order.check_payment_verifiable() {
            warn!(%order_id, status = %order.status, "Payment verification rejected");
            return Err(e.into());
        }

        let previous = order.status.clone();
        self.store.update_order_status(&mut tx, order_id, &OrderStatus::Processing).await?;
        self.store.update_payment_status(&mut tx, order_id, &PaymentStatus::PartialPaid).await?;
        let entry = OrderHistory::entry(order_id, Some(previous), OrderStatus::Processing, "Payment Verified", Some(actor.user_id));
        self.store.create_order_history(&mut tx, &entry).await?;
        self.store.commit(tx).await?;

        info!(%order_id, "Pre-order payment verified");
        order.status = OrderStatus::Processing;
        order.payment_status = PaymentStatus::PartialPaid;
        self.events.publish(DomainEvent::Order(OrderEvent::PaymentVerified { order_id, actor: actor.user_id })).await;
        Ok(order)
    }
}
