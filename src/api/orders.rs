use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::error::ApiResult;
use super::AppState;
use crate::domain::aggregates::{Order, PaymentMethod, ProductStock};
use crate::domain::value_objects::{OrderId, ProductId};
use crate::error::CommerceError;
use crate::services::{Actor, CheckoutRequest};
use crate::store::Store;

fn validate_address(address: &serde_json::Value) -> Result<(), ValidationError> {
    match address.as_object() {
        Some(fields) if !fields.is_empty() => Ok(()),
        _ => Err(ValidationError::new("address must be a non-empty object")),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    #[validate(custom = "validate_address")]
    pub address: serde_json::Value,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 64))]
    pub payment_trx_id: Option<String>,
    #[validate(length(max = 32))]
    pub payment_provider: Option<String>,
    #[validate(length(max = 20))]
    pub payment_phone: Option<String>,
}

impl From<CheckoutBody> for CheckoutRequest {
    fn from(body: CheckoutBody) -> Self {
        Self {
            address: body.address,
            payment_method: body.payment_method,
            payment_trx_id: body.payment_trx_id,
            payment_provider: body.payment_provider,
            payment_phone: body.payment_phone,
        }
    }
}

pub async fn checkout<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    body.validate()?;
    let order = state.services.checkout.checkout(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn my_orders<S: Store>(State(state): State<AppState<S>>, actor: Actor) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.services.orders.my_orders(&actor).await?))
}

/// Customers only see their own orders.
pub async fn get_order<S: Store>(State(state): State<AppState<S>>, actor: Actor, Path(id): Path<OrderId>) -> ApiResult<Json<Order>> {
    let order = state.services.orders.get_order(id).await?;
    if order.user_id != actor.user_id {
        return Err(CommerceError::NotFound { entity: "order", id: id.to_string() }.into());
    }
    Ok(Json(order))
}

pub async fn product_stock<S: Store>(State(state): State<AppState<S>>, Path(id): Path<ProductId>) -> ApiResult<Json<ProductStock>> {
    Ok(Json(state.services.inventory.product_stock(id).await?))
}
