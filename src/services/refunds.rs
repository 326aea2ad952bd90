//! Refund processing
//!
//! A refund is validated against money actually collected on the locked
//! order row, so two concurrent refunds can never exceed the paid amount
//! together.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::inventory::apply_stock_change;
use super::Actor;
use crate::domain::aggregates::{Order, OrderHistory, Refund, StockReason};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{OrderId, RefundId, VariantId};
use crate::error::{CommerceError, Result};
use crate::events::EventBus;
use crate::store::Store;

#[derive(Clone, Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub restock: bool,
}

pub struct RefundService<S: Store> {
    store: Arc<S>,
    events: EventBus,
}

impl<S: Store> Clone for RefundService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), events: self.events.clone() }
    }
}

impl<S: Store> RefundService<S> {
    pub fn new(store: Arc<S>, events: EventBus) -> Self { Self { store, events } }

    /// Refund part or all of the collected amount, optionally restocking
    /// every line. A restocking refund that clears the whole balance also
    /// moves the order to `refunded` when the status table allows it.
    #[instrument(skip(self, request, actor), fields(actor = %actor.user_id, amount = %request.amount, restock = request.restock))]
    pub async fn process_refund(&self, order_id: OrderId, request: RefundRequest, actor: &Actor) -> Result<Order> {
        let RefundRequest { amount, reason, restock } = request;
        if amount <= Decimal::ZERO {
            return Err(CommerceError::validation("refund amount must be positive"));
        }

        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let mut order = self.store.lock_order(&mut tx, order_id).await?;
        let plan = match order.plan_refund(amount, restock) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(%order_id, remaining = %order.refundable_balance(), "Refund rejected");
                return Err(e.into());
            }
        };

        let refund = Refund {
            id: RefundId::generate(),
            order_id,
            amount,
            reason: reason.clone(),
            restock,
            created_by: Some(actor.user_id),
            created_at: Utc::now(),
        };
        self.store.create_refund(&mut tx, &refund).await?;

        if restock {
            let mut per_variant: BTreeMap<VariantId, i64> = BTreeMap::new();
            for item in &order.items {
                *per_variant.entry(item.variant_id).or_default() += i64::from(item.quantity.value());
            }
            let reference = order_id.to_string();
            for (variant_id, quantity) in per_variant {
                let change = i32::try_from(quantity).map_err(|_| CommerceError::validation("quantity overflow"))?;
                apply_stock_change(self.store.as_ref(), &mut tx, variant_id, change, &StockReason::RefundRestock, &reference, &mut events).await?;
            }
        }

        let previous = order.status.clone();
        let new_status = plan.next_status.clone().unwrap_or_else(|| previous.clone());
        if let Some(next) = &plan.next_status {
            self.store.update_order_status(&mut tx, order_id, next).await?;
        }
        let entry = OrderHistory::entry(
            order_id,
            Some(previous.clone()),
            new_status.clone(),
            format!("Refunded {amount:.2}: {reason}"),
            Some(actor.user_id),
        );
        self.store.create_order_history(&mut tx, &entry).await?;
        self.store.commit(tx).await?;

        info!(%order_id, remaining = %(plan.remaining_before - amount), status = %new_status, "Refund processed");
        order.refunded_amount += amount;
        order.status = new_status.clone();

        events.insert(0, DomainEvent::Order(OrderEvent::Refunded { order_id, amount, restocked: restock, actor: actor.user_id }));
        if plan.next_status.is_some() {
            events.push(DomainEvent::Order(OrderEvent::StatusChanged { order_id, from: previous, to: new_status, actor: actor.user_id }));
        }
        self.events.publish_all(events).await;
        Ok(order)
    }
}
