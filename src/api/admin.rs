//! Admin endpoints. Role checks belong to the upstream gateway.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::error::ApiResult;
use super::AppState;
use crate::domain::aggregates::{Order, OrderHistory, OrderStatus, PaymentStatus, StockAdjustment, StockReason};
use crate::domain::value_objects::{OrderId, ProductId, VariantId};
use crate::services::{Actor, InventoryLogPage, RefundRequest};
use crate::store::Store;

const DEFAULT_LOG_LIMIT: i64 = 20;
const MAX_LOG_LIMIT: i64 = 100;

fn validate_positive(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount must be positive"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusBody {
    #[validate(length(min = 1, max = 32))]
    pub status: String,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusBody {
    #[validate(length(min = 1, max = 32))]
    pub payment_status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefundBody {
    #[validate(custom = "validate_positive")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    #[serde(default)]
    pub restock: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentBody {
    pub variant_id: VariantId,
    /// Zero is rejected by the ledger.
    pub change_amount: i32,
    #[validate(length(min = 1, max = 64))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub product_id: Option<ProductId>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

impl LogsQuery {
    /// `(limit, offset)` with out-of-range values clamped.
    fn window(&self) -> (i64, i64) {
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LOG_LIMIT).min(MAX_LOG_LIMIT);
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        (limit, (page - 1).saturating_mul(limit))
    }
}

pub async fn update_status<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Order>> {
    body.validate()?;
    let status = OrderStatus::from(body.status.trim());
    Ok(Json(state.services.orders.update_order_status(id, status, body.note, &actor).await?))
}

pub async fn update_payment_status<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<PaymentStatusBody>,
) -> ApiResult<Json<Order>> {
    body.validate()?;
    let status = PaymentStatus::from(body.payment_status.trim());
    Ok(Json(state.services.orders.update_payment_status(id, status, &actor).await?))
}

pub async fn verify_payment<S: Store>(State(state): State<AppState<S>>, actor: Actor, Path(id): Path<OrderId>) -> ApiResult<Json<Order>> {
    Ok(Json(state.services.orders.verify_order_payment(id, &actor).await?))
}

pub async fn refund<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<RefundBody>,
) -> ApiResult<Json<Order>> {
    body.validate()?;
    let request = RefundRequest { amount: body.amount, reason: body.reason, restock: body.restock };
    Ok(Json(state.services.refunds.process_refund(id, request, &actor).await?))
}

pub async fn order_history<S: Store>(State(state): State<AppState<S>>, _actor: Actor, Path(id): Path<OrderId>) -> ApiResult<Json<Vec<OrderHistory>>> {
    Ok(Json(state.services.orders.order_history(id).await?))
}

pub async fn adjust_stock<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Json(body): Json<AdjustmentBody>,
) -> ApiResult<Json<StockAdjustment>> {
    body.validate()?;
    let reason = StockReason::from(body.reason.trim().to_string());
    Ok(Json(state.services.inventory.adjust_stock(body.variant_id, body.change_amount, reason, &actor).await?))
}

pub async fn inventory_logs<S: Store>(
    State(state): State<AppState<S>>,
    _actor: Actor,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<InventoryLogPage>> {
    let (limit, offset) = query.window();
    Ok(Json(state.services.inventory.inventory_logs(query.product_id, limit, offset).await?))
}
