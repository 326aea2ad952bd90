//! Error taxonomy for the storefront core.
//!
//! Every failure carries an explicit [`ErrorKind`] assigned where the error is
//! produced. The transport maps kinds to status codes in one place
//! (`api::error`), never by inspecting messages.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::{OrderError, OrderStatus};
use crate::domain::value_objects::{ProductId, QuantityError, VariantId};
use crate::store::StoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    VariantRequired,
    InvalidTransition,
    RefundExceedsRemaining,
    CartEmpty,
    ShippingZoneNotFound,
    ExternalDependency,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::InsufficientStock => "insufficient_stock",
            Self::VariantRequired => "variant_required",
            Self::InvalidTransition => "invalid_transition",
            Self::RefundExceedsRemaining => "refund_exceeds_remaining",
            Self::CartEmpty => "cart_empty",
            Self::ShippingZoneNotFound => "shipping_zone_not_found",
            Self::ExternalDependency => "external_dependency_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("insufficient stock for variant {variant_id}")]
    InsufficientStock { variant_id: VariantId },

    #[error("please select a variant option for product {product_id}")]
    VariantRequired { product_id: ProductId },

    #[error("variant {variant_id} not found for product {product_id}")]
    VariantNotFound { product_id: ProductId, variant_id: VariantId },

    #[error("invalid transition: cannot go backward from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("cannot refund {requested} (max refundable: {remaining})")]
    RefundExceedsRemaining { requested: Decimal, remaining: Decimal },

    #[error("cart is empty")]
    CartEmpty,

    #[error("shipping configuration for {0} not found")]
    ShippingZoneNotFound(String),

    #[error("external dependency error: {0}")]
    ExternalDependency(String),

    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl CommerceError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } | Self::VariantNotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::VariantRequired { .. } => ErrorKind::VariantRequired,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::RefundExceedsRemaining { .. } => ErrorKind::RefundExceedsRemaining,
            Self::CartEmpty => ErrorKind::CartEmpty,
            Self::ShippingZoneNotFound(_) => ErrorKind::ShippingZoneNotFound,
            Self::ExternalDependency(_) => ErrorKind::ExternalDependency,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for CommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::InsufficientStock { variant_id } => Self::InsufficientStock { variant_id },
            other => Self::Store(other),
        }
    }
}

impl From<OrderError> for CommerceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            OrderError::RefundExceedsRemaining { requested, remaining } => Self::RefundExceedsRemaining { requested, remaining },
            OrderError::NonPositiveRefund(_) | OrderError::NotPreOrder => Self::Validation(err.to_string()),
        }
    }
}

impl From<QuantityError> for CommerceError {
    fn from(err: QuantityError) -> Self { Self::Validation(err.to_string()) }
}

impl From<validator::ValidationErrors> for CommerceError {
    fn from(err: validator::ValidationErrors) -> Self { Self::Validation(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
