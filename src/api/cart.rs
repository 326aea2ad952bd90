use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::error::ApiResult;
use super::AppState;
use crate::domain::aggregates::Cart;
use crate::domain::value_objects::{ProductId, VariantId};
use crate::services::Actor;
use crate::store::Store;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartBody {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

/// Zero or a negative quantity removes the line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartBody {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
}

pub async fn get_cart<S: Store>(State(state): State<AppState<S>>, actor: Actor) -> ApiResult<Json<Cart>> {
    Ok(Json(state.services.cart.get_my_cart(&actor).await?))
}

pub async fn add_item<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Json(body): Json<AddToCartBody>,
) -> ApiResult<Json<Cart>> {
    body.validate()?;
    let cart = state.services.cart.add_to_cart(&actor, body.product_id, body.variant_id, body.quantity).await?;
    Ok(Json(cart))
}

pub async fn update_item<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Json(body): Json<UpdateCartBody>,
) -> ApiResult<Json<Cart>> {
    let cart = state.services.cart.update_cart_quantity(&actor, body.product_id, body.variant_id, body.quantity).await?;
    Ok(Json(cart))
}

pub async fn remove_item<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path((product_id, variant_id)): Path<(ProductId, VariantId)>,
) -> ApiResult<Json<Cart>> {
    Ok(Json(state.services.cart.remove_from_cart(&actor, product_id, variant_id).await?))
}
